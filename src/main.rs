use anyhow::{bail, Result};
use clap::{crate_name, crate_version, Arg, Command};
use env_logger::Builder;
use lasci::defaults::CONFIG_FILE_NAME;
use lasci::initialization::LasSystem;
use lasci::io::{
    load_integrals, read_input, write_footer, write_header, write_results, Configuration,
    IntegralData,
};
use lasci::las::logging::print_las_init;
use lasci::utils::Timer;
use log::LevelFilter;
use std::io::Write;

fn main() -> Result<()> {
    // Input.
    let matches = Command::new(crate_name!())
        .version(crate_version!())
        .about("localized active space CI and SCF calculations")
        .arg(
            Arg::new("config-File")
                .help("Sets the configuration file to use")
                .default_value(CONFIG_FILE_NAME)
                .index(1),
        )
        .get_matches();
    let config_file: &str = matches
        .get_one::<String>("config-File")
        .map(String::as_str)
        .unwrap_or(CONFIG_FILE_NAME);
    let config: Configuration = read_input(config_file)?;

    // Multithreading.
    rayon::ThreadPoolBuilder::new()
        .num_threads(config.parallelization.number_of_cores)
        .build_global()?;

    // Logging.
    // The log level is set.
    let log_level: LevelFilter = match config.verbose {
        2 => LevelFilter::Trace,
        1 => LevelFilter::Debug,
        0 => LevelFilter::Info,
        -1 => LevelFilter::Warn,
        -2 => LevelFilter::Error,
        _ => LevelFilter::Info,
    };
    // and the logger is build.
    Builder::new()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .filter(None, log_level)
        .init();

    // The program header is written to the command line.
    write_header();
    // and the total wall-time timer is started.
    let timer: Timer = Timer::start();

    // Computations.
    // ................................................................
    let data: IntegralData = load_integrals(&config.integrals)?;
    let mut system = LasSystem::new(config.clone(), &data.engine, data.mo_coeff.clone())?;
    if let Some(df) = data.df.clone() {
        system = system.with_df(df);
    }
    if let Some(orbsym) = data.orbsym.clone() {
        system = system.with_orbsym(orbsym)?;
    }
    print_las_init(&system);

    match config.jobtype.as_str() {
        "lasci" => {
            system.lasci()?;
        }
        "lasscf" => {
            system.kernel()?;
        }
        jtype => {
            bail!(
                "Jobtype: {} is not available. Choose one of the available types: lasci, lasscf",
                jtype
            );
        }
    }
    write_results(&system)?;
    // ................................................................

    // Finished.
    // The total wall-time is printed together with the end statement.
    write_footer(timer);
    Ok(())
}
