use boxdesk_server::data_gateway::{SqliteRecordStore, TenantScopedStore};
use boxdesk_server::job_queue::SqliteJobStore;
use boxdesk_server::server::{run_server, ServerState, TENANT_ID_HEADER};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// A full server instance on a random port, backed by real database files in
/// a temp directory. Exposes the underlying stores for assertions.
pub struct TestServer {
    pub base_url: String,
    pub job_store: Arc<SqliteJobStore>,
    pub gateway: Arc<TenantScopedStore>,
    shutdown: CancellationToken,
    _db_dir: TempDir,
}

impl TestServer {
    pub async fn start() -> TestServer {
        let db_dir = TempDir::new().unwrap();
        let record_store = Arc::new(
            SqliteRecordStore::new(db_dir.path().join("directory.db")).unwrap(),
        );
        let gateway = Arc::new(TenantScopedStore::new(record_store));
        let job_store =
            Arc::new(SqliteJobStore::new(db_dir.path().join("jobs.db")).unwrap());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let shutdown = CancellationToken::new();
        let state = ServerState::new(gateway.clone(), job_store.clone());
        let server_shutdown = shutdown.clone();
        tokio::spawn(async move {
            run_server(listener, state, server_shutdown).await.unwrap();
        });

        TestServer {
            base_url,
            job_store,
            gateway,
            shutdown,
            _db_dir: db_dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str, tenant: &str) -> reqwest::Response {
        reqwest::Client::new()
            .get(self.url(path))
            .header(TENANT_ID_HEADER, tenant)
            .send()
            .await
            .unwrap()
    }

    pub async fn post_json(
        &self,
        path: &str,
        tenant: &str,
        body: &serde_json::Value,
    ) -> reqwest::Response {
        reqwest::Client::new()
            .post(self.url(path))
            .header(TENANT_ID_HEADER, tenant)
            .json(body)
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
