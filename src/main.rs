// ============================================================================
// ACE THE BRACKETS: ORACLE RUNNER
// ============================================================================
//
// Runs the oracle computations locally and prints the string the oracle
// network would hand back to the contract.
//
//   ace-automation new-game <8|16>
//   ace-automation prices <8|16> <cmcIds> [geckoIds]
//   ace-automation top-coins <offset> <count>
//   ace-automation random-indexes <n>

use dotenv::dotenv;
use rand::SeedableRng;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ace_automation::market::{FallbackPriceSource, Reconciler};
use ace_automation::{
    oracle, AutomationConfig, AutomationError, AutomationResult, BracketWidth, CoinGeckoClient,
    CoinMarketCapClient,
};

const USAGE: &str = "usage: ace-automation <new-game|prices|top-coins|random-indexes> [args]";

/// Max coins reconciled per oracle call
const TOP_COINS_PER_CALL: usize = 10;
/// Listing depth scanned when building the top-coin registry
const TOP_COINS_LISTING: u32 = 260;
/// Symbols whose provider records disagree
const EXCLUDED_SYMBOLS: &[&str] = &["FTM"];

fn arg<T: std::str::FromStr>(args: &[String], index: usize, name: &str) -> AutomationResult<T> {
    args.get(index)
        .ok_or_else(|| AutomationError::InvalidArgument(format!("missing <{}>", name)))?
        .parse()
        .map_err(|_| AutomationError::InvalidArgument(format!("invalid <{}>", name)))
}

fn width_arg(args: &[String], index: usize) -> AutomationResult<BracketWidth> {
    let slots: usize = arg(args, index, "width")?;
    BracketWidth::from_slots(slots)
        .ok_or_else(|| AutomationError::InvalidArgument(format!("width must be 8 or 16, got {}", slots)))
}

async fn run(args: Vec<String>) -> AutomationResult<String> {
    let command = args
        .first()
        .ok_or_else(|| AutomationError::InvalidArgument(USAGE.to_string()))?
        .as_str();

    if command == "random-indexes" {
        let size: usize = arg(&args, 1, "n")?;
        return oracle::random_indexes_wire(size, &mut rand::thread_rng());
    }

    let config = AutomationConfig::from_env()?;
    let cmc = CoinMarketCapClient::new(config.cmc_api_key.clone(), config.http_timeout)?;

    match command {
        "new-game" => {
            let width = width_arg(&args, 1)?;
            let mut rng = rand::rngs::StdRng::from_entropy();
            let payload = oracle::new_game_coins(&cmc, width, config.listing_limit, &mut rng).await?;
            Ok(payload.to_wire())
        }
        "prices" => {
            let width = width_arg(&args, 1)?;
            let cmc_ids: String = arg(&args, 2, "cmcIds")?;
            let gecko_ids = args.get(3).cloned().unwrap_or_default();
            let gecko = CoinGeckoClient::new(config.gecko_api_key.clone(), config.gecko_pro, config.http_timeout)?;
            let source = FallbackPriceSource::new(cmc, gecko);
            oracle::advance_prices(&source, width, &cmc_ids, &gecko_ids).await
        }
        "top-coins" => {
            let offset: usize = arg(&args, 1, "offset")?;
            let count: usize = arg(&args, 2, "count")?;
            let gecko = CoinGeckoClient::new(config.gecko_api_key.clone(), config.gecko_pro, config.http_timeout)?;
            let reconciler = Reconciler::new()
                .with_excluded_symbols(EXCLUDED_SYMBOLS.iter().copied())
                .with_limit_per_call(TOP_COINS_PER_CALL);
            let result =
                oracle::top_coins(&cmc, &gecko, &reconciler, TOP_COINS_LISTING, offset, count).await?;
            Ok(result.to_wire())
        }
        other => Err(AutomationError::InvalidArgument(format!("unknown command {}\n{}", other, USAGE))),
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,ace_automation=debug")))
        .with(tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    info!("ace-automation {}", args.join(" "));

    match run(args).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            error!("{}", e);
            std::process::exit(if e.is_fatal() { 2 } else { 1 });
        }
    }
}
