//! Address Explorer 主入口
//! 主机端模拟器：从环境变量中的助记词打开软件密钥存储，浏览 / 导出地址

use std::io::BufRead;
use std::path::PathBuf;

use address_explorer::{
    config::ExplorerConfig,
    domain::{AddressFormat, PathComponent, PathTemplate},
    infrastructure::{logging::init_logging, DirectoryStorage, SoftwareKeyStore},
    service::{
        format_menu, BuilderEvent, CustomPathBuilder, ExplorerSession, KeyOutcome, Keypress,
    },
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "address-explorer")]
#[command(about = "Browse and export HD wallet receive addresses")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// TOML config file (falls back to environment variables)
    #[arg(long, env = "CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the top-level menu with address stubs
    Menu {
        /// Account number for the BIP44/49/84 entries
        #[arg(long)]
        account: Option<String>,
    },
    /// Browse a ranging path page by page (keys: 9 next, 7 prev, 1 export, x leave)
    Browse {
        /// Path template, e.g. "m/84'/0'/0'/0/{idx}"
        #[arg(long)]
        path: PathTemplate,
        #[arg(long, default_value = "segwit_native")]
        format: AddressFormat,
    },
    /// Write the address summary CSV to the storage directory
    Export {
        #[arg(long)]
        path: PathTemplate,
        #[arg(long, default_value = "segwit_native")]
        format: AddressFormat,
    },
    /// Enter a non-standard path through the keypad state machine
    Custom {
        /// Path text, e.g. "1'/{idx}" or "m/44'/0'/0'/0/5"
        #[arg(long)]
        path: PathTemplate,
        #[arg(long, default_value = "classic")]
        format: AddressFormat,
        /// Accept the risk warning without prompting
        #[arg(long)]
        accept_risk: bool,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = ExplorerConfig::from_env_and_file(args.config.as_ref())?;
    config.validate()?;
    init_logging(&config.logging)?;

    let mnemonic = std::env::var("EXPLORER_MNEMONIC")
        .context("EXPLORER_MNEMONIC must hold a BIP39 mnemonic")?;
    let keys = SoftwareKeyStore::from_mnemonic(mnemonic.trim())?;
    tracing::info!(
        fingerprint = %keys.fingerprint_hex(),
        network = config.derivation.network.as_str(),
        "explorer session started"
    );

    let mut session = ExplorerSession::from_config(&keys, &config);
    let mut card = DirectoryStorage::new(&config.export.dir);

    match args.command {
        Commands::Menu { account } => {
            if let Some(account) = account {
                session.set_account(&account)?;
            }
            for line in session.menu_lines()? {
                println!("{}", line);
            }
        }
        Commands::Browse { path, format } => {
            let entry = address_explorer::domain::TemplateEntry {
                template: path,
                format,
            };
            println!("{}", session.open(&entry)?.text());
            run_keypad(&mut session, &mut card)?;
        }
        Commands::Export { path, format } => {
            let entry = address_explorer::domain::TemplateEntry {
                template: path,
                format,
            };
            session.open(&entry)?;
            if let KeyOutcome::Exported(summary) = session.press(Keypress::Export, &mut card)? {
                println!("{}", summary.message());
            }
        }
        Commands::Custom {
            path,
            format,
            accept_risk,
        } => {
            let mut builder = CustomPathBuilder::new();
            builder.handle_all(keypad_events(&path))?;
            tracing::debug!(formats = ?format_menu(), "format menu");
            builder.handle(BuilderEvent::SelectFormat(format))?;

            if let Some(warning) = builder.risk_warning() {
                println!("{}\n\n{}\n", warning.title, warning.body);
            }
            if !accept_risk && !confirm_on_stdin()? {
                builder.handle(BuilderEvent::Cancel)?;
                println!("Cancelled.");
                return Ok(());
            }
            builder.handle(BuilderEvent::AcceptRisk)?;

            let selection = builder.into_selection()?;
            let ranging = !selection.is_single();
            println!("{}", session.open_custom(selection)?.text());
            if ranging {
                run_keypad(&mut session, &mut card)?;
            }
        }
    }

    Ok(())
}

/// 把路径文本还原成操作员会按下的键
fn keypad_events(path: &PathTemplate) -> Vec<BuilderEvent> {
    let mut events = Vec::new();
    for component in path.components() {
        match component {
            PathComponent::RangePlaceholder => events.push(BuilderEvent::ChooseRange),
            PathComponent::Index(value) | PathComponent::HardenedIndex(value) => {
                events.extend(
                    value
                        .to_string()
                        .bytes()
                        .map(|b| BuilderEvent::Digit(b - b'0')),
                );
                if component.is_hardened() {
                    events.push(BuilderEvent::ToggleHardened);
                }
                events.push(BuilderEvent::ConfirmComponent);
            }
        }
    }
    if !path.is_ranging() {
        events.push(BuilderEvent::Finish);
    }
    events
}

fn confirm_on_stdin() -> Result<bool> {
    println!("Type 'y' to accept the risk, anything else to cancel.");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().eq_ignore_ascii_case("y"))
}

/// 从标准输入逐行读取按键，直到 `x` 或输入结束
fn run_keypad(
    session: &mut ExplorerSession<'_, SoftwareKeyStore>,
    card: &mut DirectoryStorage,
) -> Result<()> {
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        for key in line.trim().chars() {
            match session.press_key(key, card)? {
                Some(KeyOutcome::Screen(screen)) => println!("{}", screen.text()),
                Some(KeyOutcome::Exported(summary)) => println!("{}\n", summary.message()),
                Some(KeyOutcome::Left) => return Ok(()),
                None => {}
            }
        }
    }
    Ok(())
}
