use crate::bus::{log_topic, EventBus, Subscription};
use crate::context::Context;
use std::sync::Arc;
use tracing::debug;

pub type LogBus = EventBus<String>;

/// Live log lines of managed containers.
///
/// Followers (for example a driver tailing `docker logs -f`) publish lines;
/// watchers receive every line published after they subscribed.
pub struct LogWatcher {
    ctx: Arc<Context>,
    bus: Arc<LogBus>,
}

impl LogWatcher {
    pub fn new(ctx: Arc<Context>, bus: Arc<LogBus>) -> Self {
        Self { ctx, bus }
    }

    pub fn topic(&self, environment: &str, name: &str) -> String {
        log_topic(name, self.ctx.log_discriminator(environment))
    }

    /// Watching a container nobody follows yet is not an error; the stream
    /// stays silent until a follower starts publishing.
    pub fn watch(&self, environment: &str, name: &str) -> LogStream {
        let topic = self.topic(environment, name);
        debug!("watching logs on {topic}");
        LogStream {
            subscription: self.bus.subscribe(&topic),
        }
    }

    pub fn publish(&self, environment: &str, name: &str, line: impl Into<String>) -> usize {
        self.bus.publish(&self.topic(environment, name), line.into())
    }

    /// End every stream watching `name`.
    pub fn close(&self, environment: &str, name: &str) {
        self.bus.close(&self.topic(environment, name));
    }
}

pub struct LogStream {
    subscription: Subscription<String>,
}

impl LogStream {
    pub fn topic(&self) -> &str {
        self.subscription.topic()
    }

    /// Next line, or `None` once the follower closed the stream.
    pub async fn next_line(&mut self) -> Option<String> {
        self.subscription.recv().await
    }

    pub fn try_next_line(&mut self) -> Option<String> {
        self.subscription.try_recv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_schema::DeploymentMode;

    fn watcher(mode: DeploymentMode) -> LogWatcher {
        let ctx = Context::new("dev", mode).with_namespace("apps");
        LogWatcher::new(Arc::new(ctx), Arc::new(LogBus::new()))
    }

    #[test]
    fn topic_uses_namespace_in_cluster_mode() {
        assert_eq!(watcher(DeploymentMode::Cluster).topic("dev", "orders"), "orders-apps");
        assert_eq!(watcher(DeploymentMode::Local).topic("qa", "orders"), "orders-qa");
    }

    #[tokio::test]
    async fn lines_arrive_once_in_order() {
        let logs = watcher(DeploymentMode::Local);
        let mut stream = logs.watch("dev", "orders");
        assert!(stream.try_next_line().is_none());

        for line in ["starting", "listening on 8080", "ready"] {
            assert_eq!(logs.publish("dev", "orders", line), 1);
        }
        logs.close("dev", "orders");

        let mut received = Vec::new();
        while let Some(line) = stream.next_line().await {
            received.push(line);
        }
        assert_eq!(received, vec!["starting", "listening on 8080", "ready"]);
    }

    #[test]
    fn other_environments_are_not_mixed() {
        let logs = watcher(DeploymentMode::Local);
        let mut dev = logs.watch("dev", "orders");
        logs.publish("prod", "orders", "prod line");
        assert!(dev.try_next_line().is_none());
    }
}
