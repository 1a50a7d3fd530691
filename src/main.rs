use clap::Parser;
use resumr::{
    composer::generate_resume, configuration::ComposerConfiguration, error::ContextError,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Composes a PDF resume from a directory of text fragments", long_about = None)]
struct CliArguments {
    /// Directory holding the text fragments and the photo subdirectory
    #[arg(short = 'c', long = "content", value_name = "directory")]
    content_directory: Option<PathBuf>,
    /// Directory the resume is written to, created if needed
    #[arg(short = 'o', long = "output", value_name = "directory")]
    output_directory: Option<PathBuf>,
    /// JSON configuration file, command line options take precedence over it
    #[arg(long = "configuration", value_name = "json_file")]
    configuration_path: Option<PathBuf>,
    /// Also write the laid out document as JSON to this file
    #[arg(long = "layout", value_name = "json_file")]
    layout_path: Option<PathBuf>,
    /// Raise the log level, once for debug and twice for trace
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbosity: u8,
}

fn main() {
    if let Err(error) = fallible_main() {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

fn fallible_main() -> Result<(), ContextError> {
    let arguments = CliArguments::parse();
    env_logger::builder()
        .filter_level(match arguments.verbosity {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
        .init();
    log::debug!("{:?}", arguments);

    let mut configuration = match &arguments.configuration_path {
        Some(configuration_path) => ComposerConfiguration::from_path(configuration_path)?,
        None => ComposerConfiguration::default(),
    };
    if let Some(content_directory) = arguments.content_directory {
        configuration.content_directory = content_directory;
    }
    if let Some(output_directory) = arguments.output_directory {
        configuration.output_directory = output_directory;
    }
    log::debug!("{:?}", configuration);

    let generated_resume = generate_resume(&configuration)?;

    if let Some(layout_path) = &arguments.layout_path {
        let layout = serde_json::to_string_pretty(&generated_resume.document).map_err(|error| {
            ContextError::with_error("Failed to serialize the layout", &error)
        })?;
        std::fs::write(layout_path, layout).map_err(|error| {
            ContextError::with_error(
                format!("Failed to write the layout to {:?}", layout_path),
                &error,
            )
        })?;
        log::info!("Saved the layout to the path: {:?}", layout_path);
    }

    println!(
        "Successfully generated resume: {}",
        generated_resume.output_path.display()
    );

    Ok(())
}
