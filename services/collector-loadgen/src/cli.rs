use std::time::Duration;

pub(crate) const HELP: &str = "\
collector-loadgen - Drive random analytics events at a collector endpoint.

  --url, -u <url>            Event endpoint (default http://localhost:8081/event)
  --rps, -r <n>              Target requests per second across all workers (default 10000)
  --duration, -d <secs>      How long to run (default 10)
  --concurrency, -c <n>      Number of workers (default 100)
  --version, -V              Show version and exit
  --help,    -h              Show this help message";

const DEFAULT_URL: &str = "http://localhost:8081/event";
const DEFAULT_RPS: u64 = 10_000;
const DEFAULT_DURATION_SECS: u64 = 10;
const DEFAULT_CONCURRENCY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoadArgs {
    pub(crate) url: String,
    pub(crate) rps: u64,
    pub(crate) duration: Duration,
    pub(crate) concurrency: usize,
}

impl Default for LoadArgs {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_owned(),
            rps: DEFAULT_RPS,
            duration: Duration::from_secs(DEFAULT_DURATION_SECS),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Version,
    Help,
    Run(LoadArgs),
}

pub(crate) fn parse_args<I>(args: I) -> Result<Command, String>
where
    I: IntoIterator<Item = String>,
{
    let mut load = LoadArgs::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let flag = arg.as_str();
        match flag {
            "--version" | "-V" => return Ok(Command::Version),
            "--help" | "-h" => return Ok(Command::Help),
            "--url" | "-u" => load.url = value_of(flag, args.next())?,
            "--rps" | "-r" => load.rps = positive(flag, args.next())?,
            "--duration" | "-d" => {
                load.duration = Duration::from_secs(positive(flag, args.next())?);
            }
            "--concurrency" | "-c" => load.concurrency = positive(flag, args.next())? as usize,
            other => return Err(format!("unknown argument '{other}'")),
        }
    }

    Ok(Command::Run(load))
}

fn value_of(flag: &str, value: Option<String>) -> Result<String, String> {
    value.ok_or_else(|| format!("{flag} needs a value"))
}

fn positive(flag: &str, value: Option<String>) -> Result<u64, String> {
    let raw = value_of(flag, value)?;
    match raw.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("{flag} expects a positive integer, got '{raw}'")),
    }
}
