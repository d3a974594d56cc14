use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tally::admin::{self, SettingsForm};
use tally::cli::{AccountCommand, Cli, Command};
use tally::config::Config;
use tally::models::Metrics;
use tally::report::{self, csv, table};
use tally::store::Store;
use tally::Result;

fn init_logging(config: &Config, verbose: bool) {
    let default_level = if verbose { "debug" } else { config.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            std::process::exit(1);
        }
    };
    if let Some(db) = &cli.db {
        config.database = Some(db.clone());
    }

    init_logging(&config, cli.verbose);

    if let Err(e) = run(cli.command, &config) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn open_store(config: &Config) -> Result<Store> {
    Store::open(&config.database_path()?)
}

fn run(command: Command, config: &Config) -> Result<()> {
    let mut store = open_store(config)?;
    let now = Utc::now();

    match command {
        Command::Account(AccountCommand::Add { username }) => {
            let account = admin::add_account(&store, &username, now)?;
            println!("Added @{} as #{}", account.username, account.id);
        }
        Command::Account(AccountCommand::List(args)) => {
            let accounts = store.list_accounts()?;
            report::print(&accounts, args.json, |a| table::render_accounts(a));
        }
        Command::Account(AccountCommand::Show(args)) => {
            let account = store.find_account(args.id)?;
            report::print(&account, args.json, |a| table::render_accounts(std::slice::from_ref(a)));
        }
        Command::Account(AccountCommand::Delete(args)) => {
            admin::delete_account(&store, args.id)?;
            println!("Deleted account #{}", args.id);
        }
        Command::Record(args) => {
            let metrics = Metrics {
                followed_by: args.followed_by,
                follows: args.follows,
                media: args.media,
                er: args.er,
            };
            let id = admin::record_snapshot(&store, args.id, &metrics, args.at.unwrap_or(now))?;
            println!("Recorded snapshot #{id}");
        }
        Command::Media(args) => {
            let id = admin::record_media(
                &mut store,
                args.id,
                &args.shortcode,
                &args.tags,
                &args.mentions,
                args.at.unwrap_or(now),
            )?;
            println!("Recorded media #{id}");
        }
        Command::Dashboard(args) => {
            let dashboard = admin::dashboard(&store, args.id, config, now)?;
            report::print(&dashboard, args.json, table::render_dashboard);
        }
        Command::Stats(args) => {
            if let Some(dir) = &args.export {
                let (account, rows) = admin::all_stats(&store, args.id)?;
                let export = csv::stats(&account.username, &rows, now.date_naive());
                println!("Wrote {}", export.write_to(dir)?.display());
            } else {
                let page = config.pagination.page(args.page, args.per_page);
                let stats = admin::stats_page(&store, args.id, page)?;
                report::print(&stats, args.json, table::render_stats_page);
            }
        }
        Command::MediaTags(args) => {
            let (account, tags) = admin::media_tags(&store, args.id)?;
            if let Some(dir) = &args.export {
                let export = csv::media_tags(&account.username, &tags, now.date_naive());
                println!("Wrote {}", export.write_to(dir)?.display());
            } else {
                report::print(&tags, args.json, |t| table::render_tags(&account.username, t));
            }
        }
        Command::MediaAccounts(args) => {
            let view = admin::media_accounts(&store, args.export.id, args.user)?;
            if let Some(dir) = &args.export.export {
                let export = csv::media_accounts(&view.account.username, &view.mentions, now.date_naive());
                println!("Wrote {}", export.write_to(dir)?.display());
            } else {
                report::print(&view, args.export.json, table::render_media_accounts);
            }
        }
        Command::Note(args) => {
            admin::update_note(&mut store, args.id, args.user, &args.text, now)?;
            println!("Saved note on #{}", args.id);
        }
        Command::Settings(args) => {
            let account = store.find_account(args.id)?;
            let current = SettingsForm::from_account(&account);
            let form = SettingsForm {
                disabled: args.disabled.unwrap_or(current.disabled),
                monitoring: args.monitoring.unwrap_or(current.monitoring),
                is_valid: args.valid.unwrap_or(current.is_valid),
            };
            let saved = admin::apply_settings(&store, args.id, &form, now)?;
            print!("{}", table::render_accounts(std::slice::from_ref(&saved)));
        }
        Command::Categories(args) => {
            admin::save_categories(&mut store, args.id, &args.tags, args.user)?;
            println!("Saved {} categories on #{}", args.tags.len(), args.id);
        }
        Command::DeleteStats(args) => {
            let deleted = admin::delete_stats(&store, args.id)?;
            println!("Deleted {deleted} snapshots of #{}", args.id);
        }
        Command::DeleteAssociated(args) => {
            let deleted = admin::delete_associated(&store, args.id)?;
            println!("Deleted {deleted} media of #{}", args.id);
        }
        Command::Due(args) => {
            let due = store.due_accounts(now)?;
            report::print(&due, args.json, |a| table::render_accounts(a));
        }
        Command::MarkUpdated(args) => {
            let account = admin::mark_updated(&store, args.id, config, now)?;
            println!(
                "Next stats update for @{}: {}",
                account.username,
                tally::util::format_optional_timestamp(account.next_stats_update)
            );
        }
    }

    Ok(())
}
