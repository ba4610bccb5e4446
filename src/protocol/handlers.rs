use std::path::PathBuf;

use serde_json::{json, Value};

use super::command::Command;
use crate::engine::Engine;
use crate::model::entry::TextEntry;
use crate::services::control::RunContext;
use crate::services::worker::Job;
use crate::services::{encoding, qa};

pub fn str_field<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(|v| v.as_str()).filter(|s| !s.trim().is_empty())
}

fn required_str<'a>(payload: &'a Value, key: &str) -> Result<&'a str, String> {
    str_field(payload, key).ok_or_else(|| format!("payload.{key} is required"))
}

fn bool_field(payload: &Value, key: &str) -> Option<bool> {
    payload.get(key).and_then(|v| v.as_bool())
}

fn string_list(payload: &Value, key: &str) -> Result<Vec<String>, String> {
    let arr = payload
        .get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| format!("payload.{key} must be an array"))?;

    arr.iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| format!("payload.{key}[{i}] must be a string"))
        })
        .collect()
}

pub fn parse_entries(payload: &Value) -> Result<Vec<TextEntry>, String> {
    let arr = payload
        .get("entries")
        .and_then(|v| v.as_array())
        .ok_or_else(|| "payload.entries must be an array".to_string())?;

    let mut entries: Vec<TextEntry> = Vec::with_capacity(arr.len());

    for (i, v) in arr.iter().cloned().enumerate() {
        match serde_json::from_value::<TextEntry>(v) {
            Ok(e) => entries.push(e),
            Err(e) => return Err(format!("invalid entry at index {}: {}", i, e)),
        }
    }

    Ok(entries)
}

/// Commands answered on the reader thread.
pub fn run_short(engine: &Engine, cmd: Command, payload: &Value) -> Result<Value, String> {
    match cmd {
        Command::Ping => Ok(json!({
            "message": "blocklate-core alive",
            "version": env!("CARGO_PKG_VERSION"),
            "translator": engine.pipeline().translator_name(),
        })),

        Command::RunQa => {
            let entries = parse_entries(payload)?;
            Ok(json!({ "issues": qa::run(&entries) }))
        }

        Command::DetectEncoding => {
            let path = PathBuf::from(required_str(payload, "path")?);
            let result = encoding::detect_from_file(&path).map_err(|e| e.to_string())?;
            serde_json::to_value(result).map_err(|e| e.to_string())
        }

        Command::CacheStats => serde_json::to_value(engine.pipeline().cache().stats()).map_err(|e| e.to_string()),

        Command::AnalyzeJars => {
            let jars: Vec<PathBuf> = string_list(payload, "jars")?.into_iter().map(PathBuf::from).collect();
            serde_json::to_value(engine.analyze_jars(&jars, str_field(payload, "lang"))).map_err(|e| e.to_string())
        }

        _ => Err("unknown command".into()),
    }
}

/// Commands that call the translator. They run on a job thread under `run`.
pub fn run_long(engine: &Engine, cmd: Command, payload: &Value, run: &RunContext) -> Result<Value, String> {
    let lang = str_field(payload, "lang");

    match cmd {
        Command::TranslateTexts => {
            let texts = string_list(payload, "texts")?;
            let (texts, stats) = engine.translate_texts(&texts, lang, run);
            Ok(json!({ "texts": texts, "stats": stats }))
        }

        Command::TranslateFile => {
            let path = required_str(payload, "path")?;
            let output = str_field(payload, "output").map(PathBuf::from);
            single_job(engine, Job::for_path(path, output), lang, run)
        }

        Command::TranslateQuests => {
            let dir = PathBuf::from(required_str(payload, "dir")?);
            single_job(engine, Job::QuestDir { dir }, lang, run)
        }

        Command::TranslateJars => {
            let output_dir = PathBuf::from(required_str(payload, "output_dir")?);
            let jars: Vec<PathBuf> = string_list(payload, "jars")?.into_iter().map(PathBuf::from).collect();
            let settings = engine.settings();
            let preload = bool_field(payload, "preload").unwrap_or(settings.preload_jars);
            let replace_original = bool_field(payload, "replace_original").unwrap_or(settings.replace_original);

            let preloaded = preload.then(|| engine.preload_jars(&jars, lang, run));
            let jobs: Vec<Job> = jars
                .into_iter()
                .map(|jar| Job::Jar {
                    jar,
                    output_dir: output_dir.clone(),
                    replace_original,
                })
                .collect();
            let workers = payload.get("workers").and_then(|v| v.as_u64()).map(|n| n as usize);
            let reports = engine.run_jobs(jobs, lang, workers, run);
            Ok(json!({ "reports": reports, "preload": preloaded }))
        }

        _ => Err("unknown command".into()),
    }
}

fn single_job(engine: &Engine, job: Job, lang: Option<&str>, run: &RunContext) -> Result<Value, String> {
    let mut reports = engine.run_jobs(vec![job], lang, Some(1), run);
    let report = reports.pop().ok_or_else(|| "job produced no report".to_string())?;
    if report.is_error() {
        return Err(report.status.to_string());
    }
    Ok(json!({ "report": report }))
}
