use clap::Parser;
use core::cell::RefCell;
use embassy_executor::Executor;
use embassy_time::Duration;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use erratic_core::mk_static;
use erratic_core::utils::controllers::{ARRAY_CHANNEL, ArrayCommand, ArrayController, MotorShields};
use erratic_core::utils::{ArrayConfig, Timestamp};
use rand::{SeedableRng, rngs::SmallRng};
use static_cell::StaticCell;
use std::io::BufRead;
use tracing::{error, info, trace, warn};

/// Slots for the stock four-shield rig.
const MOTORS: usize = 16;

type Controller = ArrayController<MotorShields<'static, SimBus>, SmallRng, MOTORS>;

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts
{
    /// JSON array configuration (`{"boards": [103, 97, 96, 102]}`)
    #[clap(long)]
    config: Option<std::path::PathBuf>,
    /// board address, repeat in wiring order; overrides the config file
    #[clap(long = "board", value_parser = parse_addr)]
    boards: Vec<u8>,
    /// seed for the motor RNG; OS entropy when absent
    #[clap(long)]
    seed: Option<u64>,
    /// poll period in milliseconds
    #[clap(long, default_value_t = 50)]
    tick_ms: u64,
    /// simulate an unreachable board at this address
    #[clap(long, value_parser = parse_addr)]
    missing: Vec<u8>,
}

fn parse_addr(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("bad board address {s:?}: {e}"))
}

/// I2C bus that ACKs every address except the `missing` ones and logs writes.
struct SimBus {
    missing: Vec<u8>,
}

impl ErrorType for SimBus {
    type Error = ErrorKind;
}

impl I2c for SimBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.missing.contains(&address) {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        for op in operations {
            match op {
                Operation::Write(bytes) => trace!("i2c 0x{:02X} <- {:02X?}", address, bytes),
                Operation::Read(buf) => buf.fill(0),
            }
        }
        Ok(())
    }
}

fn load_config(opts: &Opts) -> Result<ArrayConfig, String> {
    let mut config = match &opts.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("reading {}: {e}", path.display()))?;
            serde_json::from_str(&text).map_err(|e| format!("parsing {}: {e}", path.display()))?
        }
        None => ArrayConfig::default(),
    };
    if !opts.boards.is_empty() {
        let prescale = config.prescale;
        config = ArrayConfig::with_boards(&opts.boards).ok_or("too many boards")?;
        config.prescale = prescale;
    }
    Ok(config)
}

/// Forward JSON `ArrayCommand` lines from stdin to the array task.
fn spawn_stdin_commands() {
    std::thread::spawn(|| {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ArrayCommand>(&line) {
                Ok(cmd) => {
                    if ARRAY_CHANNEL.try_send(cmd).is_err() {
                        warn!("command queue full, dropped {:?}", cmd);
                    }
                }
                Err(error) => error!(?error, "invalid command: {}", line),
            }
        }
    });
}

#[embassy_executor::task]
async fn array_task(mut ctrl: Controller, period: Duration) -> ! {
    ctrl.run(period).await
}

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let opts: Opts = Opts::parse();

    let config = match load_config(&opts) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };
    info!("boards {:02X?}, {} motors", config.boards.as_slice(), config.motor_count());

    let bus = mk_static!(RefCell<SimBus>, RefCell::new(SimBus { missing: opts.missing.clone() }));
    let shields = match MotorShields::new(bus, &config) {
        Ok(shields) => shields,
        Err(e) => {
            error!("motor shields: {:?}", e);
            std::process::exit(1);
        }
    };
    let rng = match opts.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    };

    let mut ctrl: Controller = ArrayController::new(shields, rng);
    if let Err(e) = ctrl.init(&config, Timestamp::now()) {
        error!("motor array setup failed, not starting: {:?}", e);
        if let Err(e) = ctrl.driver_mut().disable() {
            warn!("could not idle boards: {:?}", e);
        }
        std::process::exit(1);
    }

    spawn_stdin_commands();
    let period = Duration::from_millis(opts.tick_ms.max(1));
    info!("polling every {} ms; send {{\"ac\":\"halt_all\"}} on stdin to brake", opts.tick_ms);

    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner.spawn(array_task(ctrl, period)).unwrap();
    });
}
