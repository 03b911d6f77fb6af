//! fundwatch
//!
//! Funding bot for a Discord community and SCPI investment simulator.

use clap::{Parser, Subcommand};
use fundwatch::{
    bot::{CommandHandler, DiscordBot, IncomingCommand},
    client::{BalanceSource, DiscordClient, PayPalClient},
    config::Config,
    format::{format_currency, format_percentage, simulation_filename},
    monitor::{start_health_server, BalanceMonitor, HealthState},
    notify::ChatSink,
    simulator::{
        self, InvestmentType, SavingsFrequency, ScpiCalculator, ScpiType, SimulationRequest,
    },
    storage::FundingStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "fundwatch")]
#[command(about = "Server funding bot and SCPI investment simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Discord funding bot
    Bot,
    /// Serve the SCPI simulator API
    Serve,
    /// Run one simulation and print a summary
    Simulate {
        /// comete or activimmo
        #[arg(long, default_value = "comete")]
        scpi: ScpiType,
        /// pleine_propriete or nue_propriete
        #[arg(long = "type", default_value = "pleine_propriete")]
        investment_type: InvestmentType,
        /// Initial investment in euros
        #[arg(short, long)]
        amount: f64,
        /// Duration in years
        #[arg(short, long)]
        years: u32,
        /// Programmed savings per period in euros
        #[arg(long)]
        savings: Option<f64>,
        /// mensuelle, trimestrielle or semestrielle
        #[arg(long)]
        frequency: Option<SavingsFrequency>,
        /// Share of dividends reinvested, 0 to 1
        #[arg(long)]
        reinvest: Option<f64>,
        /// Write the full results as JSON into this directory
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Print the current PayPal balance
    Balance,
    /// Run a single balance check and exit
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Bot => run_bot(config).await,
        Commands::Serve => run_simulator(config).await,
        Commands::Simulate {
            scpi,
            investment_type,
            amount,
            years,
            savings,
            frequency,
            reinvest,
            export,
        } => {
            let request = SimulationRequest {
                scpi_type: scpi,
                investment_type,
                investment_amount: amount,
                duration_years: years,
                programmed_savings_amount: savings,
                programmed_savings_frequency: frequency,
                dividend_reinvestment_rate: reinvest,
            };
            run_simulation(config, request, export)
        }
        Commands::Balance => show_balance(config).await,
        Commands::Check => run_check(config).await,
    }
}

async fn run_bot(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting Discord PayPal bot");

    if config.discord.bot_token.is_empty() {
        anyhow::bail!("Discord bot token is not configured (DISCORD_BOT_TOKEN)");
    }

    let store = Arc::new(FundingStore::new(
        config.storage.resolved_path(),
        config.storage.default_monthly_cost,
    ));
    let state = store.load().await?;
    tracing::info!(
        "Loaded funding state from {} (monthly cost {}€)",
        store.path().display(),
        state.monthly_server_cost
    );

    let discord = DiscordClient::new(&config.discord.api_base, &config.discord.bot_token)?;
    let me = discord.current_user().await?;
    tracing::info!("✅ Bot logged in as {}", me.username);

    let paypal: Arc<dyn BalanceSource> = Arc::new(PayPalClient::new(&config.paypal)?);
    let chat: Arc<dyn ChatSink> = Arc::new(discord.clone());

    let monitor = Arc::new(BalanceMonitor::new(
        paypal.clone(),
        chat.clone(),
        store.clone(),
        config.monitor.clone(),
        config.discord.notification_channel_id.clone(),
    ));
    monitor.start();

    let health = Arc::new(HealthState::new());
    let (host, port) = (config.health.host.clone(), config.health.port);
    tokio::spawn(async move {
        if let Err(e) = start_health_server(health, &host, port).await {
            tracing::error!("Health server error: {}", e);
        }
    });

    let (cmd_tx, cmd_rx) = mpsc::channel::<IncomingCommand>(100);
    let handler = CommandHandler::new(
        paypal,
        chat,
        store,
        config.discord.admin_user_id.clone(),
    );
    tokio::spawn(async move {
        handler.run(cmd_rx).await;
    });

    let channels = config.discord.command_channels();
    if channels.is_empty() {
        tracing::warn!("No command channel configured, commands disabled");
    }

    let bot = Arc::new(DiscordBot::new(
        discord,
        channels,
        config.discord.prefix.clone(),
        Duration::from_millis(config.discord.poll_interval_ms),
        cmd_tx,
    ));

    tokio::select! {
        _ = bot.start_polling() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}

async fn run_simulator(config: Config) -> anyhow::Result<()> {
    simulator::start_server(&config.simulator)
        .await
        .map_err(|e| anyhow::anyhow!("Simulator server error: {}", e))
}

fn run_simulation(
    config: Config,
    request: SimulationRequest,
    export: Option<PathBuf>,
) -> anyhow::Result<()> {
    request.check_fields().map_err(anyhow::Error::msg)?;

    let calculator = ScpiCalculator::new(&config.simulator);
    let results = calculator.calculate(&request)?;

    println!(
        "\n🏠 Simulation SCPI {} ({}) sur {} ans",
        results.scpi_type, results.investment_type, results.duration_years
    );
    println!("═══════════════════════════════════════");
    println!("Investissement initial : {}", format_currency(results.initial_investment, false));
    println!("Total investi          : {}", format_currency(results.total_invested, false));
    println!("Capital final          : {}", format_currency(results.final_capital_value, false));
    println!("Dividendes perçus      : {}", format_currency(results.total_dividends_received, false));
    println!("Rendement total        : {}", format_currency(results.total_return, false));
    println!("Rendement annuel moyen : {}", format_percentage(results.annual_yield, 2));
    println!("Parts : {:.2} → {:.2}", results.initial_shares, results.final_shares);
    println!();

    for year in &results.yearly_projections {
        println!(
            "  Année {:>2} │ capital {:>12} │ dividendes cumulés {:>10}",
            year.year,
            format_currency(year.total_capital_value, false),
            format_currency(year.cumulative_dividends, false)
        );
    }

    if let Some(dir) = export {
        let filename = simulation_filename(
            results.scpi_type.as_str(),
            results.initial_investment,
            results.duration_years,
            chrono::Local::now().date_naive(),
            "json",
        );
        let path = dir.join(filename);
        std::fs::write(&path, serde_json::to_string_pretty(&results)?)?;
        println!("\n📄 Exported to {}", path.display());
    }

    Ok(())
}

async fn show_balance(config: Config) -> anyhow::Result<()> {
    let paypal = PayPalClient::new(&config.paypal)?;
    let balance = paypal.get_account_balance().await?;
    println!("💰 PayPal balance: {:.2}€", balance);
    Ok(())
}

async fn run_check(config: Config) -> anyhow::Result<()> {
    let store = Arc::new(FundingStore::new(
        config.storage.resolved_path(),
        config.storage.default_monthly_cost,
    ));
    store.load().await?;

    let discord = DiscordClient::new(&config.discord.api_base, &config.discord.bot_token)?;
    let monitor = BalanceMonitor::new(
        Arc::new(PayPalClient::new(&config.paypal)?),
        Arc::new(discord),
        store,
        config.monitor.clone(),
        config.discord.notification_channel_id.clone(),
    );

    let outcome = monitor.check_balance().await?;
    println!(
        "Balance {:.2}€ / monthly cost {:.2}€ ({}){}",
        outcome.balance,
        outcome.monthly_cost,
        outcome.status(),
        match (outcome.alert_recorded, outcome.alert_sent) {
            (true, true) => ", alert sent",
            (true, false) => ", alert not delivered",
            _ => "",
        }
    );
    Ok(())
}
