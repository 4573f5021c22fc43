use anyhow::Result;
use log::LevelFilter;

use pcanet_eval::evaluation::run_evaluation;
use pcanet_eval::input::{build_command, RunArguments};

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("PCANET_LOG", "error,pcanet=info"))
        .init();

    let matches = build_command().get_matches();
    let args = RunArguments::from_matches(&matches)?;
    log::info!(
        "[PCANet::Eval] Running {:?} on {} training / {} test samples",
        args.config.regimes,
        args.config.datasize.n_train,
        args.config.datasize.n_test
    );

    match run_evaluation(&args.config, &args.transformer, &args.ensemble) {
        Ok(records) => {
            for record in &records {
                println!("{}", serde_json::to_string_pretty(record)?);
            }
            Ok(())
        }
        Err(e) => {
            log::error!("Evaluation failed: {:#}", e);
            std::process::exit(1)
        }
    }
}
