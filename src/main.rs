use splat_viewer::cli::CliOverrides;
use splat_viewer::runner::run_headless;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            log::error!("{err}");
            std::process::exit(2);
        }
    };
    if let Err(err) = run_headless(&cli) {
        log::error!("Viewer error: {err:?}");
        std::process::exit(1);
    }
}
