//! Pipeline compilation command.

use anyhow::Context;
use clap::Args;
use ffgraph_config::{ConfigError, PipelineConfig, paths};

#[derive(Args)]
pub struct CompileArgs {
    /// Pipeline file, or the name of a pipeline in the user pipelines directory
    #[arg(value_name = "PIPELINE")]
    pipeline: String,

    /// Print the command as a JSON array of tokens
    #[arg(long)]
    json: bool,

    /// Override the pipeline's output destination
    #[arg(short, long, value_name = "DEST")]
    output: Option<String>,
}

pub fn run(args: CompileArgs) -> anyhow::Result<()> {
    let path = paths::find_pipeline(&args.pipeline)
        .ok_or_else(|| ConfigError::PipelineNotFound(args.pipeline.clone()))?;

    let mut config = PipelineConfig::load(&path)
        .with_context(|| format!("failed to load pipeline {}", path.display()))?;
    if let Some(output) = args.output {
        config.output = output;
    }

    let command = config
        .compile()
        .with_context(|| format!("failed to compile pipeline {}", path.display()))?;
    tracing::info!(tokens = command.args().len(), "compiled {}", path.display());

    if args.json {
        println!("{}", serde_json::to_string(command.args())?);
    } else {
        println!("{command}");
    }
    Ok(())
}
