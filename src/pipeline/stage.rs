//! Stage names and the fan-out helper used by parallel stages.

use crate::error::{PipelineError, PipelineResult, ScanResult};
use crate::scanner::SharedScanner;
use crate::types::Finding;
use futures::future::join_all;
use std::fmt;
use std::sync::Arc;

/// A position in the fixed pipeline topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Parallel subdomain enumeration.
    Discovery,
    /// DNS resolution and wildcard filtering.
    Resolution,
    /// HTTP liveness probing.
    Probe,
    /// Serial sweep and fingerprint chain.
    PortScan,
    Screenshot,
    /// Extra serial scanners appended after everything else.
    Trailing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Discovery => "discovery",
            Self::Resolution => "resolution",
            Self::Probe => "probe",
            Self::PortScan => "port-scan",
            Self::Screenshot => "screenshot",
            Self::Trailing => "trailing",
        };
        f.write_str(name)
    }
}

/// What one parallel worker reported.
#[derive(Debug)]
pub(crate) struct WorkerOutcome {
    pub scanner: String,
    pub result: ScanResult<Vec<Finding>>,
}

/// Run every scanner on the same input, one task each, and wait for all.
///
/// Outcomes come back in `scanners` order no matter which worker finished
/// first, so the caller's merge is deterministic. Each worker owns its
/// result buffer; nothing is shared until the join.
pub(crate) async fn fan_out(
    stage: Stage,
    scanners: &[SharedScanner],
    input: Arc<[String]>,
) -> PipelineResult<Vec<WorkerOutcome>> {
    let names: Vec<String> = scanners.iter().map(|s| s.name().to_string()).collect();

    let handles = scanners.iter().map(|scanner| {
        let scanner = Arc::clone(scanner);
        let input = Arc::clone(&input);
        tokio::spawn(async move { scanner.execute(&input).await })
    });

    let joined = join_all(handles).await;

    names
        .into_iter()
        .zip(joined)
        .map(|(scanner, joined)| match joined {
            Ok(result) => Ok(WorkerOutcome { scanner, result }),
            Err(_) => Err(PipelineError::WorkerPanicked { stage, scanner }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;
    use crate::scanner::Scanner;
    use async_trait::async_trait;
    use std::time::Duration;

    struct Sleepy {
        name: &'static str,
        delay_ms: u64,
    }

    #[async_trait]
    impl Scanner for Sleepy {
        fn name(&self) -> &str {
            self.name
        }

        async fn execute(&self, input: &[String]) -> ScanResult<Vec<Finding>> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            if self.name == "broken" {
                return Err(ScanError::execution(self.name, "boom"));
            }
            Ok(input
                .iter()
                .map(|d| Finding::domain(format!("{}.{}", self.name, d)))
                .collect())
        }
    }

    struct Panicky;

    #[async_trait]
    impl Scanner for Panicky {
        fn name(&self) -> &str {
            "panicky"
        }

        async fn execute(&self, _input: &[String]) -> ScanResult<Vec<Finding>> {
            panic!("worker blew up");
        }
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::PortScan.to_string(), "port-scan");
        assert_eq!(Stage::Discovery.to_string(), "discovery");
    }

    #[tokio::test]
    async fn test_fan_out_keeps_configured_order() {
        let scanners: Vec<SharedScanner> = vec![
            Arc::new(Sleepy { name: "slow", delay_ms: 50 }),
            Arc::new(Sleepy { name: "broken", delay_ms: 0 }),
            Arc::new(Sleepy { name: "fast", delay_ms: 1 }),
        ];
        let input: Arc<[String]> = vec!["example.com".to_string()].into();

        let outcomes = fan_out(Stage::Discovery, &scanners, input).await.unwrap();
        let names: Vec<_> = outcomes.iter().map(|o| o.scanner.as_str()).collect();
        assert_eq!(names, ["slow", "broken", "fast"]);
        assert_eq!(
            outcomes[0].result.as_ref().unwrap(),
            &vec![Finding::domain("slow.example.com")]
        );
        assert!(outcomes[1].result.is_err());
    }

    #[tokio::test]
    async fn test_panicking_worker_is_reported() {
        let scanners: Vec<SharedScanner> = vec![
            Arc::new(Sleepy { name: "fine", delay_ms: 0 }),
            Arc::new(Panicky),
        ];
        let input: Arc<[String]> = vec!["example.com".to_string()].into();

        let err = fan_out(Stage::Discovery, &scanners, input).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::WorkerPanicked { stage: Stage::Discovery, ref scanner } if scanner == "panicky"
        ));
    }
}
