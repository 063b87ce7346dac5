//! Command-line entry point.
//!
//! # Responsibility
//! - Load configuration, start logging and open the store.
//! - Seed demo data into an empty store and print the demo user's views.

use bunny_core::service::repository::{DEMO_LIST, DEMO_USER};
use bunny_core::{
    init_logging, open_store, open_store_in_memory, AppConfig, EntityRepository, ErrorKind,
    FocusBucket, Store, UserItem,
};
use log::{error, info};
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_exit module=cli status=error error={err}");
            eprintln!("bunny: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::from_env()?;
    init_logging(config.log_level, &config.log_target)?;

    let store: Store = match &config.db_path {
        Some(path) => open_store(path, &config.store)?,
        None => open_store_in_memory(&config.store)?,
    };
    let repo = EntityRepository::new(&store);

    match repo.user_by_id(DEMO_USER) {
        Ok(_) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!("event=cli_seed module=cli status=start user={DEMO_USER}");
            repo.seed_demo_data()?;
        }
        Err(err) => return Err(err.into()),
    }

    let user = repo.user_by_id(DEMO_USER)?;
    let focus = repo.focus_list(DEMO_USER)?;
    println!("focus of {}:", user.name);
    for bucket in FocusBucket::ALL {
        let ids = focus.ids(bucket);
        println!("  {bucket}: {ids:?}");
    }

    let list = repo.list_by_id(DEMO_LIST)?;
    println!("list {} ({}):", list.id, list.title);
    for (position, entry) in (1..).zip(repo.user_list_items(DEMO_USER, DEMO_LIST)?) {
        print_row(position, &entry);
    }
    Ok(())
}

fn print_row(position: usize, entry: &UserItem) {
    let focus = entry.focus.map(|bucket| bucket.as_str()).unwrap_or("-");
    println!(
        "  {position:>3}. [{:?}] {} ({focus})",
        entry.item.state, entry.item.title
    );
}
