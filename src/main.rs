use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::Parser;

mod cli;
mod config;
mod engine;
mod error;
mod logging;
mod model;
mod parsers;
mod protocol;
mod services;

use cli::{Cli, Command};
use engine::Engine;
use model::report::JobReport;
use services::control::{Progress, Reporter, RunContext};
use services::worker::Job;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.global.verbose);

    let mut settings = match config::load(cli.global.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "cannot load settings");
            return ExitCode::FAILURE;
        }
    };
    cli.global.overrides().apply(&mut settings);

    let engine = match Engine::from_settings(settings) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!(error = %e, "cannot start engine");
            return ExitCode::FAILURE;
        }
    };

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let stdin = io::stdin();
            protocol::serve(engine, stdin.lock(), Arc::new(Mutex::new(io::stdout())));
            ExitCode::SUCCESS
        }
        Command::Quests { dir } => finish(engine.run_jobs(vec![Job::QuestDir { dir }], None, None, &console_run())),
        Command::Lang { file, output } => {
            finish(engine.run_jobs(vec![Job::for_path(file, output)], None, None, &console_run()))
        }
        Command::Jars {
            jars,
            output,
            preload,
            replace_original,
        } => {
            let run = console_run();
            if preload || engine.settings().preload_jars {
                let stats = engine.preload_jars(&jars, None, &run);
                tracing::info!(new = stats.new_translations, cached = stats.cache_hits, "preload finished");
            }
            let replace_original = replace_original || engine.settings().replace_original;
            let jobs = jars
                .into_iter()
                .map(|jar| Job::Jar {
                    jar,
                    output_dir: output.clone(),
                    replace_original,
                })
                .collect();
            finish(engine.run_jobs(jobs, None, None, &run))
        }
        Command::Analyze { jars } => {
            let survey = engine.analyze_jars(&jars, None);
            match serde_json::to_string_pretty(&survey) {
                Ok(text) => {
                    let _ = writeln!(io::stdout().lock(), "{text}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    tracing::error!(error = %e, "cannot encode survey");
                    ExitCode::FAILURE
                }
            }
        }
        Command::Text { texts } => {
            let (out, stats) = engine.translate_texts(&texts, None, &console_run());
            let mut stdout = io::stdout().lock();
            for line in out {
                let _ = writeln!(stdout, "{line}");
            }
            tracing::info!(cache_hits = stats.cache_hits, new = stats.new_translations, failed = stats.failed, "done");
            ExitCode::SUCCESS
        }
    }
}

fn console_run() -> RunContext {
    let reporter = Reporter::new(|p| match p {
        Progress::Message { message } => tracing::info!("{message}"),
        Progress::Percent { done, total } => tracing::debug!(done, total, "progress"),
    });
    RunContext::new(Default::default(), reporter)
}

fn finish(reports: Vec<JobReport>) -> ExitCode {
    let mut failed = false;
    for r in &reports {
        failed |= r.is_error();
        tracing::info!(
            input = %r.input.display(),
            output = ?r.output,
            status = %r.status,
            strings = r.stats.total_strings,
            new = r.stats.new_translations,
            cached = r.stats.cache_hits,
            issues = r.issues.len(),
            "job finished"
        );
        for e in &r.errors {
            tracing::warn!("{e}");
        }
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
