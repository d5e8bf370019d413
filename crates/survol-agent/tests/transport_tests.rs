//! Both transports against real bound ports

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;
use survol_agent::{start, AgentClient, AgentConfig, AgentHandle, Transport};
use survol_core::namespace::{class_iri, predicate_iri, RDF_TYPE, XSD_INTEGER};
use survol_core::{process_moniker, SurvolError, Term, TripleGraph};
use survol_rdf::parse_rdf_xml;

async fn agent(transport: Transport) -> AgentHandle {
    let config = AgentConfig {
        port: 0,
        transport,
        foreground: false,
        cgi_program: Some(PathBuf::from(env!("CARGO_BIN_EXE_survol-agent"))),
        ..AgentConfig::default()
    };
    start(config).await.unwrap().unwrap()
}

async fn fetch_rdf(handle: &AgentHandle, class: &str) -> TripleGraph {
    let url = format!(
        "{}/survol/sources_types/enumerate_{}.py?mode=rdf",
        handle.base_url(),
        class
    );
    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.status(), 200, "{}", url);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/rdf+xml"
    );
    parse_rdf_xml(&response.text().await.unwrap()).unwrap()
}

fn class_assertions(graph: &TripleGraph) -> BTreeSet<String> {
    graph
        .find(None, Some(RDF_TYPE), None)
        .into_iter()
        .map(|t| t.object.value().to_string())
        .collect()
}

#[tokio::test]
async fn own_process_listed_twice() {
    let handle = agent(Transport::Persistent).await;
    let pid = std::process::id();
    let subject = process_moniker(pid).subject_uri();
    let handle_literal = Term::literal(pid.to_string(), XSD_INTEGER);

    for _ in 0..2 {
        let graph = fetch_rdf(&handle, "CIM_Process").await;
        assert!(graph.contains(&survol_core::Triple::new(
            subject.clone(),
            predicate_iri("Handle"),
            handle_literal.clone()
        )));
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn concurrent_requests_stay_separate() {
    let handle = agent(Transport::Persistent).await;
    let classes = ["group", "user", "CIM_ComputerSystem", "CIM_LogicalDisk", "CIM_Process"];

    let mut baselines = Vec::new();
    for class in classes {
        baselines.push(fetch_rdf(&handle, class).await);
    }

    let concurrent = futures::future::join_all(classes.iter().map(|class| fetch_rdf(&handle, class))).await;

    for ((class, baseline), graph) in classes.iter().zip(&baselines).zip(&concurrent) {
        let expected: BTreeSet<String> = [class_iri(class)].into_iter().collect();
        if !graph.is_empty() {
            assert_eq!(class_assertions(graph), expected, "{}", class);
        }
        if matches!(*class, "group" | "user" | "CIM_ComputerSystem") {
            assert!(graph.same_triples(baseline), "{} changed under concurrency", class);
        }
    }

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_class_is_404() {
    let handle = agent(Transport::Persistent).await;
    let url = format!(
        "{}/survol/sources_types/enumerate_NoSuchClass.py?mode=rdf",
        handle.base_url()
    );
    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.status(), 404);
    assert!(response.text().await.unwrap().contains("NoSuchClass"));
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn transports_agree() {
    let persistent = agent(Transport::Persistent).await;
    let per_request = agent(Transport::PerRequest).await;

    for class in ["group", "user"] {
        let a = fetch_rdf(&persistent, class).await;
        let b = fetch_rdf(&per_request, class).await;
        assert!(a.same_triples(&b), "{} differs between transports", class);
    }

    let landing = |base: String| async move {
        reqwest::get(format!("{}/survol/entity.py", base))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap()
    };
    assert_eq!(
        landing(persistent.base_url()).await,
        landing(per_request.base_url()).await
    );

    persistent.shutdown().await.unwrap();
    per_request.shutdown().await.unwrap();
}

#[tokio::test]
async fn per_request_errors_pass_through() {
    let handle = agent(Transport::PerRequest).await;
    let response = reqwest::get(format!(
        "{}/survol/sources_types/enumerate_NoSuchClass.py",
        handle.base_url()
    ))
    .await
    .unwrap();
    assert_eq!(response.status(), 404);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn broken_cgi_program_is_502() {
    let config = AgentConfig {
        port: 0,
        transport: Transport::PerRequest,
        foreground: false,
        cgi_program: Some(PathBuf::from("/bin/true")),
        ..AgentConfig::default()
    };
    let handle = start(config).await.unwrap().unwrap();
    let response = reqwest::get(format!("{}/survol/entity.py", handle.base_url()))
        .await
        .unwrap();
    assert_eq!(response.status(), 502);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn client_enumerates_and_looks_up() {
    let handle = agent(Transport::Persistent).await;
    let client = AgentClient::new(handle.base_url());

    let moniker = process_moniker(std::process::id());
    let graph = client.enumerate("CIM_Process", &[]).await.unwrap();
    assert!(!graph.find(Some(&moniker.subject_uri()), None, None).is_empty());

    let one = client.entity(&moniker).await.unwrap();
    assert_eq!(class_assertions(&one), [class_iri("CIM_Process")].into_iter().collect());

    let missing = client.enumerate("NoSuchClass", &[]).await.unwrap_err();
    assert!(matches!(missing, SurvolError::NotFound(_)));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn scripts_dir_is_checked() {
    let dir = tempfile::tempdir().unwrap();
    let config = AgentConfig {
        port: 0,
        foreground: false,
        scripts_root: dir.path().to_path_buf(),
        ..AgentConfig::default()
    };
    let handle = start(config).await.unwrap().unwrap();
    handle.shutdown().await.unwrap();

    let gone = dir.path().join("missing");
    let config = AgentConfig {
        port: 0,
        foreground: false,
        scripts_root: gone,
        ..AgentConfig::default()
    };
    assert!(matches!(
        start(config).await,
        Err(SurvolError::TransportStartupFailure(_))
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn hanging_cgi_child_is_502() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let program = dir.path().join("stuck-agent");
    std::fs::write(&program, "#!/bin/sh\nexec sleep 30\n").unwrap();
    std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

    let config = AgentConfig {
        port: 0,
        transport: Transport::PerRequest,
        foreground: false,
        cgi_program: Some(program),
        cgi_timeout_secs: 1,
        ..AgentConfig::default()
    };
    let handle = start(config).await.unwrap().unwrap();

    let started = std::time::Instant::now();
    let response = reqwest::get(format!("{}/survol/entity.py", handle.base_url()))
        .await
        .unwrap();
    assert_eq!(response.status(), 502);
    assert!(response.text().await.unwrap().contains("timed out"));
    assert!(started.elapsed() < Duration::from_secs(10));

    handle.shutdown().await.unwrap();
}

fn python_available() -> bool {
    std::process::Command::new("python3")
        .arg("-c")
        .arg("pass")
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn key_values(graph: &TripleGraph, class: &str, key: &str) -> BTreeSet<String> {
    let subjects: BTreeSet<String> = graph
        .find(None, Some(RDF_TYPE), Some(&Term::iri(class_iri(class))))
        .into_iter()
        .map(|t| t.subject.clone())
        .collect();
    graph
        .find(None, Some(predicate_iri(key).as_str()), None)
        .into_iter()
        .filter(|t| subjects.contains(&t.subject))
        .map(|t| t.object.value().to_string())
        .collect()
}

#[tokio::test]
async fn python_packages_agree_across_transports() {
    if !python_available() {
        return;
    }
    let persistent = agent(Transport::Persistent).await;
    let per_request = agent(Transport::PerRequest).await;

    let a = fetch_rdf(&persistent, "python_package").await;
    let b = fetch_rdf(&per_request, "python_package").await;
    let ids = key_values(&a, "python_package", "Id");
    assert_eq!(ids, key_values(&b, "python_package", "Id"));
    assert!(ids.iter().all(|id| *id == id.to_lowercase()));

    persistent.shutdown().await.unwrap();
    per_request.shutdown().await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn running_user_is_listed() {
    let Ok(name) = std::env::var("USER") else {
        return;
    };
    // USER can be stale under su or sudo; only check accounts that exist
    let account_exists = std::fs::read_to_string("/etc/passwd")
        .map(|passwd| passwd.lines().any(|line| line.split(':').next() == Some(name.as_str())))
        .unwrap_or(false);
    if !account_exists {
        return;
    }

    let handle = agent(Transport::Persistent).await;
    let graph = fetch_rdf(&handle, "user").await;
    let names = key_values(&graph, "user", "Name");
    assert!(names.contains(&name), "{} not in {:?}", name, names);
    assert!(!graph
        .find(Some(&survol_core::user_moniker(&name).subject_uri()), None, None)
        .is_empty());
    handle.shutdown().await.unwrap();
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn ext4_disks_report_their_file_system() {
    let has_ext4 = std::fs::read_to_string("/proc/mounts")
        .map(|mounts| {
            mounts.lines().any(|line| {
                let fields: Vec<&str> = line.split_whitespace().collect();
                fields.len() > 2 && fields[0].starts_with("/dev/") && fields[2] == "ext4"
            })
        })
        .unwrap_or(false);
    if !has_ext4 {
        return;
    }

    let handle = agent(Transport::Persistent).await;
    let graph = fetch_rdf(&handle, "CIM_LogicalDisk").await;
    let file_systems = key_values(&graph, "CIM_LogicalDisk", "file_system");
    assert!(file_systems.contains("ext4"), "{:?}", file_systems);
    handle.shutdown().await.unwrap();
}
