// End-to-end tests over a real tonic transport.

use crate::server::{config::ServerConfig, service::handler::GradeService};
use core::time::Duration;
use grade_registry_core::proto::{
    GradeRequest, StudentDisciplineRequest, StudentRequest,
    grade_registry_client::GradeRegistryClient,
};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tokio_stream::{StreamExt, wrappers::TcpListenerStream};
use tonic::transport::Channel;

struct TestServer {
    client: GradeRegistryClient<Channel>,
    service: GradeService,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<anyhow::Result<()>>,
}

async fn start(config: ServerConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let service = GradeService::new(config);
    let (stop, stopped) = oneshot::channel::<()>();

    let handle = tokio::spawn(crate::serve(
        service.clone(),
        TcpListenerStream::new(listener),
        async move {
            let _ = stopped.await;
        },
    ));

    let client = GradeRegistryClient::connect(format!("http://{addr}"))
        .await
        .unwrap();

    TestServer {
        client,
        service,
        stop,
        handle,
    }
}

fn grade(discipline_code: &str, year: i32, term: i32, score: f64) -> GradeRequest {
    GradeRequest {
        student_id: "A1".into(),
        discipline_code: discipline_code.into(),
        year,
        term,
        score,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn example_scenario_over_the_wire() {
    let TestServer {
        mut client,
        stop,
        handle,
        ..
    } = start(ServerConfig::default()).await;

    assert!(client.add_grade(grade("MATH", 2024, 1, 8.5)).await.unwrap().into_inner().success);
    assert!(client.add_grade(grade("PHYS", 2024, 1, 7.0)).await.unwrap().into_inner().success);

    let avg = client
        .compute_average(StudentRequest {
            student_id: "A1".into(),
        })
        .await
        .unwrap()
        .into_inner();
    assert!(avg.success);
    assert!((avg.average - 7.75).abs() < 1e-9);

    let amended = client
        .amend_grade(grade("MATH", 2024, 1, 9.5))
        .await
        .unwrap()
        .into_inner();
    assert!(amended.success);

    let query = client
        .query_grade(StudentDisciplineRequest {
            student_id: "A1".into(),
            discipline_code: "MATH".into(),
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(query.grade.unwrap().score, 9.5);

    let grades: Vec<_> = client
        .list_grades(StudentRequest {
            student_id: "A1".into(),
        })
        .await
        .unwrap()
        .into_inner()
        .collect::<Result<Vec<_>, _>>()
        .await
        .unwrap();
    let listed: Vec<_> = grades
        .iter()
        .map(|g| (g.discipline_code.as_str(), g.score))
        .collect();
    assert_eq!(listed, vec![("MATH", 9.5), ("PHYS", 7.0)]);

    drop(client);
    stop.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn domain_miss_is_not_a_transport_fault() {
    let TestServer {
        mut client,
        stop,
        handle,
        ..
    } = start(ServerConfig::default()).await;

    let resp = client.amend_grade(grade("MATH", 2024, 1, 1.0)).await;
    let resp = resp.expect("domain miss must arrive with an OK status");
    assert!(!resp.into_inner().success);

    // An unknown student streams zero items and completes normally.
    let mut stream = client
        .list_grades(StudentRequest {
            student_id: "nobody".into(),
        })
        .await
        .unwrap()
        .into_inner();
    assert!(stream.next().await.is_none());

    let status = client
        .add_grade(GradeRequest::default())
        .await
        .unwrap_err();
    assert_eq!(status.code(), tonic::Code::InvalidArgument);

    drop(client);
    stop.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn client_abort_mid_stream_is_an_early_stop() {
    let config = ServerConfig {
        stream_buffer_size: 1,
        ..ServerConfig::default()
    };
    let TestServer {
        mut client,
        service,
        stop,
        handle,
    } = start(config).await;

    for i in 0..500 {
        client
            .add_grade(grade(&format!("D{i}"), 2024, 1, 5.0))
            .await
            .unwrap();
    }

    let mut stream = client
        .list_grades(StudentRequest {
            student_id: "A1".into(),
        })
        .await
        .unwrap()
        .into_inner();
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.discipline_code, "D0");
    drop(stream);

    // The producer notices the disconnect and releases its slot.
    for _ in 0..200 {
        if service.streams_inflight() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(service.streams_inflight(), 0);

    // Writers are not blocked by the aborted stream.
    assert!(client.add_grade(grade("LATE", 2025, 1, 6.0)).await.unwrap().into_inner().success);
    assert_eq!(service.registry().record_count(), 501);

    drop(client);
    stop.send(()).unwrap();
    handle.await.unwrap().unwrap();
}
