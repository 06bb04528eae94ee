use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use anyhow::Result;
use tokio::sync::broadcast;

use crate::schedule::types::RunSnapshot;

/// Receives every snapshot a run publishes, in publication order.
///
/// Observers never influence orchestration; a failing observer is logged
/// and the run carries on.
#[async_trait]
pub trait RunObserver: Send + Sync {
    async fn on_snapshot(&self, snapshot: &RunSnapshot) -> Result<()>;
}

// HTTP 回调实现
pub struct HttpCallback {
    client: reqwest::Client,
    callback_url: String,
}

impl HttpCallback {
    pub fn new(callback_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, callback_url })
    }

    pub fn url(&self) -> &str {
        &self.callback_url
    }
}

#[async_trait]
impl RunObserver for HttpCallback {
    async fn on_snapshot(&self, snapshot: &RunSnapshot) -> Result<()> {
        let response = self.client
            .post(&self.callback_url)
            .json(snapshot)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "callback {} answered with status: {}",
                self.callback_url,
                response.status()
            ));
        }
        Ok(())
    }
}

// 函数回调实现
pub struct FunctionCallback<F> {
    callback: F,
}

impl<F> FunctionCallback<F>
where
    F: Fn(&RunSnapshot) -> Result<()> + Send + Sync + 'static,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

#[async_trait]
impl<F> RunObserver for FunctionCallback<F>
where
    F: Fn(&RunSnapshot) -> Result<()> + Send + Sync + 'static,
{
    async fn on_snapshot(&self, snapshot: &RunSnapshot) -> Result<()> {
        (self.callback)(snapshot)
    }
}

// 内部事件回调实现
#[derive(Clone)]
pub struct EventCallback {
    pub sender: broadcast::Sender<Arc<RunSnapshot>>,
}

impl EventCallback {
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<Arc<RunSnapshot>>) {
        let (sender, receiver) = broadcast::channel(capacity);
        (Self { sender }, receiver)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<RunSnapshot>> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl RunObserver for EventCallback {
    async fn on_snapshot(&self, snapshot: &RunSnapshot) -> Result<()> {
        // no subscribers is fine, nobody is watching right now
        let _ = self.sender.send(Arc::new(snapshot.clone()));
        Ok(())
    }
}
