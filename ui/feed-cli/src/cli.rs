pub(crate) const HELP: &str = "\
feed-cli - Scroll through a paginated feed from the terminal.

  --version, -V        Show version and exit
  --help,    -h        Show this help message
  --click <id>         Report a click on item <id> once the feed is loaded (repeatable)

Environment:
  SCROLLFEED_LIST_URL, SCROLLFEED_ANALYTICS_URL, SCROLLFEED_PAGE_SIZE,
  SCROLLFEED_HTTP_TIMEOUT_SECS, SCROLLFEED_POLL_MS, SCROLLFEED_STATE_DIR, RUST_LOG";

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Version,
    Help,
    Run { clicks: Vec<u64> },
}

pub(crate) fn parse_args<I>(args: I) -> Result<Command, String>
where
    I: IntoIterator<Item = String>,
{
    let mut clicks = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => return Ok(Command::Version),
            "--help" | "-h" => return Ok(Command::Help),
            "--click" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--click needs an item id".to_owned())?;
                let id = value
                    .parse()
                    .map_err(|_| format!("invalid item id '{value}'"))?;
                clicks.push(id);
            }
            other => return Err(format!("unknown argument '{other}'")),
        }
    }

    Ok(Command::Run { clicks })
}
