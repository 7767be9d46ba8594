//! Nmap adapter: service fingerprinting of already-open ports.
//!
//! Input is `ip:port[:host]` tokens from the sweep. Ports are grouped by IP
//! and each IP gets a single `nmap -sV` run. A host whose run fails is
//! logged and skipped so the rest of the batch still reports.

use crate::error::ScanResult;
use crate::scanner::process;
use crate::scanner::traits::Scanner;
use crate::types::{Finding, Port, PortService, PortToken, Protocol};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// `22/tcp   open  ssh     OpenSSH 8.2p1 Ubuntu`
static SERVICE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)/(\w+)\s+open\s+(\S+)\s*(.*)").expect("service line pattern is valid")
});

/// Open ports of one IP, plus the host name the sweep reported for it.
#[derive(Debug, Default, PartialEq, Eq)]
struct HostPorts {
    ip: String,
    host: String,
    ports: Vec<Port>,
}

impl HostPorts {
    fn port_list(&self) -> String {
        self.ports
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Group tokens by IP in first-seen order. Malformed tokens are skipped.
fn group_by_ip(input: &[String]) -> Vec<HostPorts> {
    let mut hosts: Vec<HostPorts> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for raw in input {
        let token: PortToken = match raw.parse() {
            Ok(token) => token,
            Err(e) => {
                debug!(error = %e, "skipping token");
                continue;
            }
        };

        let slot = *index.entry(token.ip.clone()).or_insert_with(|| {
            hosts.push(HostPorts {
                ip: token.ip.clone(),
                ..HostPorts::default()
            });
            hosts.len() - 1
        });

        let entry = &mut hosts[slot];
        if !entry.ports.contains(&token.port) {
            entry.ports.push(token.port);
        }
        if let Some(host) = token.host {
            entry.host = host;
        }
    }

    hosts
}

/// Extract fingerprinted services from nmap's normal output.
fn parse_services(output: &str, ip: &str, host: &str) -> Vec<PortService> {
    output
        .lines()
        .filter_map(|line| SERVICE_LINE.captures(line))
        .filter_map(|caps| {
            let port: Port = caps[1].parse().ok()?;
            Some(PortService {
                ip: ip.to_string(),
                port,
                protocol: Protocol::from_label(&caps[2]),
                service: caps[3].to_string(),
                version: caps[4].trim().to_string(),
                domain: host.to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct NmapScanner;

impl NmapScanner {
    pub const TOOL: &'static str = "nmap";

    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Scanner for NmapScanner {
    fn name(&self) -> &str {
        "Nmap"
    }

    async fn execute(&self, input: &[String]) -> ScanResult<Vec<Finding>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }
        let exe = process::locate(Self::TOOL)?;

        let targets = group_by_ip(input);
        info!(scanner = self.name(), hosts = targets.len(), "fingerprinting services");

        let findings = self.scan_hosts(&exe, &targets).await;
        info!(scanner = self.name(), services = findings.len(), "fingerprinting finished");
        Ok(findings)
    }
}

impl NmapScanner {
    /// One `nmap -sV` run per host; failures are logged and skipped.
    async fn scan_hosts(&self, exe: &Path, targets: &[HostPorts]) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (n, target) in targets.iter().enumerate() {
            debug!(
                scanner = self.name(),
                ip = %target.ip,
                ports = target.ports.len(),
                "scanning host {}/{}",
                n + 1,
                targets.len()
            );

            let mut command = Command::new(exe);
            command
                .args(["-sV", "-Pn", "-T4", "--open", "-p"])
                .arg(target.port_list())
                .arg(&target.ip);

            let output = match process::output(Self::TOOL, command).await {
                Ok(output) if output.status.success() => output,
                Ok(output) => {
                    warn!(
                        scanner = self.name(),
                        ip = %target.ip,
                        status = %output.status,
                        stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                        "host scan failed, skipping"
                    );
                    continue;
                }
                Err(e) => {
                    warn!(scanner = self.name(), ip = %target.ip, error = %e, "host scan failed, skipping");
                    continue;
                }
            };

            let stdout = String::from_utf8_lossy(&output.stdout);
            findings.extend(
                parse_services(&stdout, &target.ip, &target.host)
                    .into_iter()
                    .map(Finding::PortService),
            );
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Starting Nmap 7.94 ( https://nmap.org )
Nmap scan report for 1.2.3.4
Host is up (0.020s latency).

PORT     STATE SERVICE VERSION
22/tcp   open  ssh     OpenSSH 8.2p1 Ubuntu 4ubuntu0.5 (Ubuntu Linux; protocol 2.0)
3306/tcp open  mysql   MySQL 8.0.32
161/udp  open  snmp
Service detection performed.
";

    #[test]
    fn test_parse_services() {
        let services = parse_services(SAMPLE, "1.2.3.4", "db.example.com");
        assert_eq!(services.len(), 3);

        assert_eq!(services[0].port.as_u16(), 22);
        assert_eq!(services[0].service, "ssh");
        assert!(services[0].version.starts_with("OpenSSH 8.2p1"));
        assert_eq!(services[0].domain, "db.example.com");

        assert_eq!(services[2].protocol, Protocol::Udp);
        assert_eq!(services[2].version, "");
    }

    #[test]
    fn test_group_by_ip() {
        let input: Vec<String> = [
            "1.2.3.4:22:a.example.com",
            "5.6.7.8:8080",
            "1.2.3.4:3306:a.example.com",
            "1.2.3.4:22:a.example.com",
            "garbage",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let groups = group_by_ip(&input);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].ip, "1.2.3.4");
        assert_eq!(groups[0].host, "a.example.com");
        assert_eq!(groups[0].port_list(), "22,3306");
        assert_eq!(groups[1].host, "");
        assert_eq!(groups[1].port_list(), "8080");
    }

    #[tokio::test]
    async fn test_empty_input_skips_tool() {
        assert!(NmapScanner::new().execute(&[]).await.unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_host_does_not_drop_batch() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("nmap");
        std::fs::write(
            &exe,
            "#!/bin/sh\ncase \"$*\" in\n  *1.1.1.1*) echo 'host down' >&2; exit 1 ;;\n  *) echo '22/tcp open ssh OpenSSH 9.6' ;;\nesac\n",
        )
        .unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

        let input: Vec<String> = ["1.1.1.1:22:a.example.com", "2.2.2.2:22:b.example.com"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let findings = NmapScanner::new().scan_hosts(&exe, &group_by_ip(&input)).await;

        assert_eq!(findings.len(), 1);
        match &findings[0] {
            Finding::PortService(svc) => {
                assert_eq!(svc.ip, "2.2.2.2");
                assert_eq!(svc.domain, "b.example.com");
                assert_eq!(svc.service, "ssh");
            }
            other => panic!("unexpected finding: {:?}", other),
        }
    }
}
