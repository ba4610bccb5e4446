#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    TranslateTexts,
    TranslateFile,
    TranslateQuests,
    TranslateJars,
    RunQa,
    DetectEncoding,
    CacheStats,
    AnalyzeJars,
    Cancel,
    Pause,
    Resume,
    Unknown,
}

impl From<&str> for Command {
    fn from(s: &str) -> Self {
        match s {
            "ping" => Command::Ping,
            "translate_texts" => Command::TranslateTexts,
            "translate_file" => Command::TranslateFile,
            "translate_quests" => Command::TranslateQuests,
            "translate_jars" => Command::TranslateJars,
            "run_qa" => Command::RunQa,
            "detect_encoding" | "encoding.detect" => Command::DetectEncoding,
            "cache.stats" => Command::CacheStats,
            "analyze_jars" => Command::AnalyzeJars,
            "cancel" => Command::Cancel,
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            _ => Command::Unknown,
        }
    }
}

impl Command {
    /// Commands that talk to the translator run in the background, one at a time.
    pub fn is_long(self) -> bool {
        matches!(
            self,
            Command::TranslateTexts | Command::TranslateFile | Command::TranslateQuests | Command::TranslateJars
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names() {
        assert_eq!(Command::from("cache.stats"), Command::CacheStats);
        assert_eq!(Command::from("encoding.detect"), Command::DetectEncoding);
        assert_eq!(Command::from("analyze_jars"), Command::AnalyzeJars);
        assert_eq!(Command::from("glossary.reload"), Command::Unknown);
        assert!(!Command::from("analyze_jars").is_long());
        assert!(Command::from("translate_jars").is_long());
        assert!(!Command::from("cancel").is_long());
    }
}
