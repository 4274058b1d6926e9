use clap::Parser;
use tracing::info;

use hdrset_prep::{
    cli::{CliArgs, Command},
    config::Config,
    pipeline::{
        clips::collect_clip_sources, BitrateLadder, ClipRunner, FrameSampler, LadderRunner,
        RunSummary, SourceScanner,
    },
    utils::{find_video_files, setup_logging, FfmpegWrapper, Result},
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let config = Config::load_with_fallback(&args.config)?;

    setup_logging(
        args.log_level(&config.logging.level),
        config.logging.show_timestamps,
        config.logging.colored_output && args.should_use_color(),
    )?;

    let ffmpeg = FfmpegWrapper::new(config.tools.ffmpeg.clone(), config.tools.ffprobe.clone());
    ffmpeg.check_availability().await?;

    match &args.command {
        Command::Scan { input, manifest } => {
            let scanner = SourceScanner::new(ffmpeg, config.scan.clone());
            let selected = scanner.scan(input, manifest).await?;
            info!("Scan complete: {} source(s) selected", selected);
        }

        Command::Clips { input, output } => {
            let sources = collect_clip_sources(input)?;
            let runner = ClipRunner::new(ffmpeg, config.clips.clone());
            let summary = runner.run(sources, output).await?;
            report("Clipping", summary);
        }

        Command::Ladder {
            input,
            ladder,
            output,
        } => {
            let table = BitrateLadder::from_csv_path(ladder, config.ladder.skip_reference_row)?;
            let sources = find_video_files(input)?;
            let runner = LadderRunner::new(ffmpeg, table, &config.ladder);
            let summary = runner.run(sources, output).await?;
            report("Ladder compression", summary);
        }

        Command::Frames {
            input,
            output,
            count,
        } => {
            let sampler = FrameSampler::new(ffmpeg, config.frames.clone());
            let summary = sampler.run(input, output, *count).await?;
            report("Frame extraction", summary);
        }
    }

    Ok(())
}

fn report(stage: &str, summary: RunSummary) {
    info!(
        "{} complete: {} done, {} skipped, {} failed",
        stage, summary.completed, summary.skipped, summary.failed
    );
}
