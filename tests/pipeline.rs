//! Orchestrator behavior against fake scanners. No external process is
//! spawned here.

use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use trawl::error::{PipelineError, ScanError, ScanResult};
use trawl::pipeline::{Pipeline, Stage};
use trawl::scanner::Scanner;
use trawl::types::{Finding, FindingKind, OpenPort, Port, PortService, Protocol, ScreenshotBatch, WebService};

type Transform = fn(&[String]) -> Vec<Finding>;

#[derive(Clone)]
enum Behavior {
    Return(Vec<Finding>),
    Map(Transform),
    Missing,
    Fail,
    Panic,
}

/// Records every input it is given and answers according to its behavior.
#[derive(Clone)]
struct Fake {
    name: String,
    behavior: Behavior,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl Fake {
    fn new(name: &str, behavior: Behavior) -> Self {
        Self {
            name: name.to_string(),
            behavior,
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn returning(name: &str, findings: Vec<Finding>) -> Self {
        Self::new(name, Behavior::Return(findings))
    }

    fn domains(name: &str, hosts: &[&str]) -> Self {
        Self::returning(name, hosts.iter().map(|h| Finding::domain(*h)).collect())
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Scanner for Fake {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: &[String]) -> ScanResult<Vec<Finding>> {
        self.calls.lock().unwrap().push(input.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if input.is_empty() {
            return Ok(Vec::new());
        }

        match &self.behavior {
            Behavior::Return(findings) => Ok(findings.clone()),
            Behavior::Map(transform) => Ok(transform(input)),
            Behavior::Missing => Err(ScanError::tool_not_found(self.name.to_lowercase())),
            Behavior::Fail => Err(ScanError::execution(self.name.to_lowercase(), "exit status 1")),
            Behavior::Panic => panic!("{} blew up", self.name),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn web(domain: &str) -> Finding {
    Finding::WebService(WebService {
        url: format!("http://{}", domain),
        status_code: 200,
        title: String::new(),
        technologies: Vec::new(),
        ip: "10.0.0.1".to_string(),
        domain: domain.to_string(),
        discovered_at: Utc::now(),
    })
}

fn open_port(host: &str, ip: &str, port: u16) -> Finding {
    Finding::OpenPort(OpenPort {
        host: host.to_string(),
        ip: ip.to_string(),
        port: Port::new(port).unwrap(),
    })
}

fn kinds(findings: &[Finding]) -> Vec<FindingKind> {
    findings.iter().map(Finding::kind).collect()
}

fn fingerprint(tokens: &[String]) -> Vec<Finding> {
    tokens
        .iter()
        .filter_map(|token| token.parse::<trawl::types::PortToken>().ok())
        .map(|token| {
            Finding::PortService(PortService {
                ip: token.ip.to_string(),
                port: token.port,
                protocol: Protocol::Tcp,
                service: "ssh".to_string(),
                version: String::new(),
                domain: token.host.unwrap_or_default(),
            })
        })
        .collect()
}

fn screenshot(tokens: &[String]) -> Vec<Finding> {
    let root = tokens[0].split('|').nth(1).unwrap_or_default().to_string();
    vec![Finding::Screenshot(ScreenshotBatch {
        screenshot_dir: PathBuf::from("/tmp/shots").join(&root),
        database_path: PathBuf::from("/tmp/shots").join(&root).join("gowitness.sqlite3"),
        root_domain: root,
        screenshot_count: tokens.len(),
    })]
}

#[tokio::test]
async fn discovery_merges_without_duplicates() {
    let first = Fake::domains("First", &["a.example.com", "b.example.com", "a.example.com"]);
    let second = Fake::domains("Second", &["b.example.com", "c.example.com"]);
    let raw: Vec<&str> = vec!["a.example.com", "b.example.com", "c.example.com"];

    let pipeline = Pipeline::new()
        .add_discovery_scanner(first.clone())
        .add_discovery_scanner(second.clone());
    let report = assert_ok!(pipeline.execute(&strings(&["example.com"])).await);

    let hosts: Vec<&str> = report.hosts().collect();
    assert_eq!(hosts, ["a.example.com", "b.example.com", "c.example.com"]);
    assert!(hosts.iter().all(|h| raw.contains(h)));
    assert_eq!(report.summary.discovered, 3);

    // Every scanner sees the whole input.
    assert_eq!(first.calls(), vec![strings(&["example.com"])]);
    assert_eq!(second.calls(), vec![strings(&["example.com"])]);
}

#[tokio::test]
async fn discovery_drops_non_domain_findings() {
    let noisy = Fake::returning(
        "Noisy",
        vec![Finding::domain("a.example.com"), web("b.example.com"), Finding::domain("")],
    );
    let report = assert_ok!(
        Pipeline::new()
            .add_discovery_scanner(noisy)
            .execute(&strings(&["example.com"]))
            .await
    );
    assert_eq!(report.hosts().collect::<Vec<_>>(), ["a.example.com"]);
}

#[tokio::test]
async fn missing_discovery_tool_is_the_same_as_omitting_it() {
    let first = Fake::domains("First", &["a.example.com", "b.example.com"]);
    let second = Fake::domains("Second", &["c.example.com", "a.example.com"]);
    let missing = Fake::new("Missing", Behavior::Missing);
    let input = strings(&["example.com"]);

    let baseline = assert_ok!(
        Pipeline::new()
            .add_discovery_scanner(first.clone())
            .add_discovery_scanner(second.clone())
            .execute(&input)
            .await
    );

    for position in 0..3 {
        let mut scanners = vec![first.clone(), second.clone()];
        scanners.insert(position, missing.clone());
        let pipeline = scanners
            .into_iter()
            .fold(Pipeline::new(), |p, s| p.add_discovery_scanner(s));

        let report = assert_ok!(pipeline.execute(&input).await);
        assert_eq!(report.findings, baseline.findings);
        assert_eq!(report.unavailable, ["Missing"]);
    }
}

#[tokio::test]
async fn discovery_failure_aborts_after_siblings_finish() {
    let slow = Fake::domains("Slow", &["a.example.com"]).with_delay(Duration::from_millis(50));
    let broken = Fake::new("Broken", Behavior::Fail);
    let probe = Fake::returning("Probe", vec![web("a.example.com")]);

    let pipeline = Pipeline::new()
        .add_discovery_scanner(slow.clone())
        .add_discovery_scanner(broken)
        .set_probe(probe.clone());

    let err = assert_err!(pipeline.execute(&strings(&["example.com"])).await);
    assert_eq!(err.stage(), Stage::Discovery);
    assert!(matches!(
        err,
        PipelineError::Scanner { ref scanner, source: ScanError::ExecutionFailed { .. }, .. }
            if scanner == "Broken"
    ));
    assert_eq!(slow.calls().len(), 1);
    assert!(probe.calls().is_empty());
}

#[tokio::test]
async fn panicking_worker_is_reported() {
    let pipeline = Pipeline::new()
        .add_discovery_scanner(Fake::domains("Fine", &["a.example.com"]))
        .add_discovery_scanner(Fake::new("Wild", Behavior::Panic));

    let err = assert_err!(pipeline.execute(&strings(&["example.com"])).await);
    assert!(matches!(
        err,
        PipelineError::WorkerPanicked { stage: Stage::Discovery, ref scanner } if scanner == "Wild"
    ));
}

#[tokio::test]
async fn resolver_only_keeps_confirmed_candidates() {
    let discovery = Fake::domains("Discovery", &["a.example.com", "b.example.com", "c.example.com"]);
    let resolver = Fake::domains("Resolver", &["c.example.com", "a.example.com", "z.example.com", "a.example.com"]);
    let probe = Fake::new("Probe", Behavior::Map(|hosts| hosts.iter().map(|h| web(h)).collect()));

    let report = assert_ok!(
        Pipeline::new()
            .add_discovery_scanner(discovery)
            .set_resolver(resolver.clone())
            .set_probe(probe.clone())
            .execute(&strings(&["example.com"]))
            .await
    );

    assert_eq!(
        resolver.calls(),
        vec![strings(&["a.example.com", "b.example.com", "c.example.com"])]
    );
    assert_eq!(report.hosts().collect::<Vec<_>>(), ["c.example.com", "a.example.com"]);
    assert_eq!(report.summary.resolved, 2);
    assert_eq!(report.summary.filtered_out, 1);
    assert_eq!(probe.calls(), vec![strings(&["c.example.com", "a.example.com"])]);
}

#[tokio::test]
async fn missing_resolver_passes_hosts_through() {
    let report = assert_ok!(
        Pipeline::new()
            .add_discovery_scanner(Fake::domains("Discovery", &["a.example.com", "b.example.com"]))
            .set_resolver(Fake::new("Resolver", Behavior::Missing))
            .execute(&strings(&["example.com"]))
            .await
    );
    assert_eq!(report.summary.resolved, 2);
    assert_eq!(report.summary.filtered_out, 0);
    assert_eq!(report.unavailable, ["Resolver"]);
}

#[tokio::test]
async fn resolver_failure_is_fatal() {
    let err = assert_err!(
        Pipeline::new()
            .add_discovery_scanner(Fake::domains("Discovery", &["a.example.com"]))
            .set_resolver(Fake::new("Resolver", Behavior::Fail))
            .execute(&strings(&["example.com"]))
            .await
    );
    assert_eq!(err.stage(), Stage::Resolution);
}

#[tokio::test]
async fn port_chain_runs_when_probe_is_missing() {
    let sweep = Fake::returning("Sweep", vec![open_port("a.example.com", "1.2.3.4", 22)]);
    let fingerprinter = Fake::new("Fingerprint", Behavior::Map(fingerprint));

    let report = assert_ok!(
        Pipeline::new()
            .set_probe(Fake::new("Probe", Behavior::Missing))
            .add_port_scanner(sweep)
            .add_port_scanner(fingerprinter)
            .execute_from_subdomains(&strings(&["a.example.com"]))
            .await
    );

    assert_eq!(kinds(&report.findings), [FindingKind::OpenPort, FindingKind::PortService]);
    assert_eq!(report.web_services().count(), 0);
    assert_eq!(report.unavailable, ["Probe"]);
}

#[tokio::test]
async fn probe_runs_when_port_chain_is_missing() {
    let report = assert_ok!(
        Pipeline::new()
            .set_probe(Fake::returning("Probe", vec![web("a.example.com")]))
            .add_port_scanner(Fake::new("Sweep", Behavior::Missing))
            .execute_from_subdomains(&strings(&["a.example.com"]))
            .await
    );
    assert_eq!(kinds(&report.findings), [FindingKind::WebService]);
    assert_eq!(report.unavailable, ["Sweep"]);
}

#[tokio::test]
async fn chain_keeps_sweep_results_without_fingerprinter() {
    let report = assert_ok!(
        Pipeline::new()
            .add_port_scanner(Fake::returning("Sweep", vec![open_port("h", "1.2.3.4", 22)]))
            .add_port_scanner(Fake::new("Fingerprint", Behavior::Missing))
            .execute_from_subdomains(&strings(&["h"]))
            .await
    );
    assert_eq!(kinds(&report.findings), [FindingKind::OpenPort]);
    assert_eq!(report.summary.open_ports, 1);
    assert_eq!(report.summary.port_services, 0);
}

#[tokio::test]
async fn open_port_becomes_ip_port_host_token() {
    let fingerprinter = Fake::new("Fingerprint", Behavior::Map(fingerprint));

    let report = assert_ok!(
        Pipeline::new()
            .add_port_scanner(Fake::returning(
                "Sweep",
                vec![open_port("h", "1.2.3.4", 22), open_port("", "5.6.7.8", 8080)],
            ))
            .add_port_scanner(fingerprinter.clone())
            .execute_from_subdomains(&strings(&["h"]))
            .await
    );

    assert_eq!(fingerprinter.calls(), vec![strings(&["1.2.3.4:22:h", "5.6.7.8:8080"])]);
    assert_eq!(report.summary.port_services, 2);
}

#[tokio::test]
async fn branch_failure_waits_for_the_other_branch() {
    let sweep = Fake::returning("Sweep", vec![open_port("h", "1.2.3.4", 22)])
        .with_delay(Duration::from_millis(50));

    let err = assert_err!(
        Pipeline::new()
            .set_probe(Fake::new("Probe", Behavior::Fail))
            .add_port_scanner(sweep.clone())
            .execute_from_subdomains(&strings(&["h"]))
            .await
    );
    assert_eq!(err.stage(), Stage::Probe);
    assert_eq!(sweep.calls().len(), 1);

    let err = assert_err!(
        Pipeline::new()
            .set_probe(Fake::returning("Probe", vec![web("h")]))
            .add_port_scanner(Fake::new("Sweep", Behavior::Fail))
            .execute_from_subdomains(&strings(&["h"]))
            .await
    );
    assert_eq!(err.stage(), Stage::PortScan);
}

#[tokio::test]
async fn screenshots_run_once_per_root_domain() {
    let probe = Fake::returning(
        "Probe",
        vec![web("a.example.com"), web("b.example.com"), web("c.other.com")],
    );
    let shooter = Fake::new("Shooter", Behavior::Map(screenshot));

    let report = assert_ok!(
        Pipeline::new()
            .set_probe(probe)
            .set_screenshot_scanner(shooter.clone())
            .execute_from_subdomains(&strings(&["a.example.com", "b.example.com", "c.other.com"]))
            .await
    );

    assert_eq!(
        shooter.calls(),
        vec![
            strings(&["http://a.example.com|example.com", "http://b.example.com|example.com"]),
            strings(&["http://c.other.com|other.com"]),
        ]
    );
    let roots: Vec<&str> = report.screenshots().map(|b| b.root_domain.as_str()).collect();
    assert_eq!(roots, ["example.com", "other.com"]);
    assert_eq!(report.summary.screenshots, 3);
}

#[tokio::test]
async fn screenshot_failures_do_not_stop_other_groups() {
    let shooter = Fake::new("Shooter", Behavior::Fail);

    let report = assert_ok!(
        Pipeline::new()
            .set_probe(Fake::returning("Probe", vec![web("a.example.com"), web("c.other.com")]))
            .set_screenshot_scanner(shooter.clone())
            .execute_from_subdomains(&strings(&["a.example.com"]))
            .await
    );
    assert_eq!(shooter.calls().len(), 2);
    assert_eq!(report.screenshots().count(), 0);
    assert_eq!(report.web_services().count(), 2);
}

#[tokio::test]
async fn from_subdomains_matches_full_run_with_same_hosts() {
    let probe = Fake::returning("Probe", vec![web("a.example.com")]);
    let sweep = Fake::returning("Sweep", vec![open_port("a.example.com", "1.2.3.4", 443)]);
    let fingerprinter = Fake::new("Fingerprint", Behavior::Map(fingerprint));

    let shared = Pipeline::new()
        .set_probe(probe)
        .add_port_scanner(sweep)
        .add_port_scanner(fingerprinter);
    let full = shared
        .clone()
        .add_discovery_scanner(Fake::domains("Discovery", &["a.example.com"]));

    let from_full = assert_ok!(full.execute(&strings(&["example.com"])).await);
    let from_subs = assert_ok!(shared.execute_from_subdomains(&strings(&["a.example.com"])).await);

    let without_hosts: Vec<&Finding> = from_full
        .findings
        .iter()
        .filter(|f| !matches!(f, Finding::Domain(_)))
        .collect();
    assert_eq!(without_hosts, from_subs.findings.iter().collect::<Vec<_>>());
    assert_eq!(from_subs.hosts().count(), 0);
    assert_eq!(from_full.hosts().collect::<Vec<_>>(), ["a.example.com"]);
}

#[tokio::test]
async fn trailing_scanners_pass_string_tokens_along() {
    let first = Fake::new(
        "First",
        Behavior::Map(|input| {
            let mut out: Vec<Finding> = input.iter().map(|h| Finding::domain(format!("www.{}", h))).collect();
            out.push(open_port("x", "1.2.3.4", 22));
            out
        }),
    );
    let missing = Fake::new("Missing", Behavior::Missing);
    let last = Fake::domains("Last", &[]);

    let report = assert_ok!(
        Pipeline::new()
            .add_scanner(first.clone())
            .add_scanner(missing)
            .add_scanner(last.clone())
            .execute_from_subdomains(&strings(&["a.example.com"]))
            .await
    );

    assert_eq!(first.calls(), vec![strings(&["a.example.com"])]);
    assert_eq!(last.calls(), vec![strings(&["www.a.example.com"])]);
    assert_eq!(report.unavailable, ["Missing"]);
    assert_eq!(report.findings.len(), 2);
}

#[tokio::test]
async fn empty_pipeline_and_empty_input() {
    let report = assert_ok!(Pipeline::new().execute(&strings(&["example.com"])).await);
    assert_eq!(report.hosts().collect::<Vec<_>>(), ["example.com"]);

    let probe = Fake::returning("Probe", vec![web("a.example.com")]);
    let report = assert_ok!(
        Pipeline::new()
            .add_discovery_scanner(Fake::domains("Discovery", &["a.example.com"]))
            .set_probe(probe)
            .execute(&[])
            .await
    );
    assert!(report.findings.is_empty());
    assert_eq!(report.summary.inputs, 0);
}
