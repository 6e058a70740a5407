use clap::Parser;

use crate::detector::DETECTOR_ID;
use crate::threshold::ThresholdAnnotator;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "query-snitch")]
#[command(about = "Demo web app instrumented with N+1 query detection")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // SQLite database path, ":memory:" for a throwaway one
    #[arg(short, long, default_value = ":memory:")]
    pub database: String,

    // Installed middleware (comma-separated)
    // Leave out the detector id to switch detection off
    #[arg(short, long, value_delimiter = ',', default_value = DETECTOR_ID)]
    pub middleware: Vec<String>,
}

// process-wide settings, read-only after startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub middleware: Vec<String>,
}

impl Settings {
    pub fn new<I, S>(middleware: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            middleware: middleware.into_iter().map(Into::into).collect(),
        }
    }

    pub fn detector_active(&self) -> bool {
        self.middleware.iter().any(|m| m == DETECTOR_ID)
    }

    pub fn threshold(&self, threshold: i64) -> ThresholdAnnotator {
        ThresholdAnnotator::new(threshold, self.detector_active())
    }
}

impl From<&Args> for Settings {
    fn from(args: &Args) -> Self {
        Self::new(args.middleware.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detector_on_by_default() {
        let args = Args::parse_from(["query-snitch"]);
        let settings = Settings::from(&args);

        assert_eq!(settings.middleware, vec![DETECTOR_ID.to_string()]);
        assert!(settings.detector_active());
    }

    #[test]
    fn middleware_list_is_comma_separated() {
        let args = Args::parse_from([
            "query-snitch",
            "--middleware",
            "app.middleware.timing,app.middleware.auth",
        ]);
        let settings = Settings::from(&args);

        assert_eq!(settings.middleware.len(), 2);
        assert!(!settings.detector_active());
    }

    #[test]
    fn annotator_follows_detector_presence() {
        let on = Settings::new(["app.middleware.auth", DETECTOR_ID]);
        let off = Settings::new(["app.middleware.auth"]);

        assert!(on.threshold(3).is_active());
        assert_eq!(on.threshold(3).threshold(), 3);
        assert!(!off.threshold(3).is_active());
        assert!(!Settings::default().threshold(3).is_active());
    }
}
