use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use dotenv::dotenv;
use log::{debug, error, info, warn};
use rumqttc::{Client, Connection, ConnectionError, Event, MqttOptions, Outgoing, Packet, QoS};

use super::{FeedError, SensorChannel, SensorUpdate};
use crate::cache::SensorChannelCache;
use crate::config::MqttConfig;

type TopicMap = Vec<(String, SensorChannel)>;

/// MQTT subscriber that pushes every sensor reading into the cache.
///
/// The event loop runs on its own thread. [`stop`](Self::stop) disconnects the
/// client, which ends the loop without waiting for another broker message, and
/// then joins the thread.
pub struct MqttFeed {
    client: Client,
    shutdown_signal: Arc<AtomicBool>,
    handle: Option<JoinHandle<Result<(), FeedError>>>,
}

impl MqttFeed {
    /// Connects with `MQTT_USER` / `MQTT_PASS` from the environment or `.env`.
    pub fn start(config: &MqttConfig, cache: Arc<SensorChannelCache>) -> Result<Self, FeedError> {
        dotenv().ok(); // 加载 .env 文件

        let mqtt_user =
            env::var("MQTT_USER").map_err(|_| FeedError::MissingCredential("MQTT_USER"))?;
        let mqtt_pass =
            env::var("MQTT_PASS").map_err(|_| FeedError::MissingCredential("MQTT_PASS"))?;
        Self::start_with_credentials(config, cache, mqtt_user, mqtt_pass)
    }

    pub fn start_with_credentials(
        config: &MqttConfig,
        cache: Arc<SensorChannelCache>,
        user: String,
        pass: String,
    ) -> Result<Self, FeedError> {
        let mut mqtt_options = MqttOptions::new(&config.client_id, &config.broker, config.port);
        mqtt_options
            .set_credentials(user, pass)
            .set_keep_alive(Duration::from_secs(u64::from(config.keep_alive)));

        let topics: TopicMap = vec![
            (config.topics.acceleration.clone(), SensorChannel::Acceleration),
            (config.topics.rotation.clone(), SensorChannel::Rotation),
            (config.topics.compass.clone(), SensorChannel::Compass),
            (config.topics.location.clone(), SensorChannel::Location),
        ];

        let (client, connection) = Client::new(mqtt_options, 10);
        for (topic, _) in &topics {
            client.subscribe(topic.as_str(), QoS::AtMostOnce)?;
        }

        let shutdown_signal = Arc::new(AtomicBool::new(false));
        let thread_shutdown = Arc::clone(&shutdown_signal);
        let handle = thread::Builder::new()
            .name("mqtt-feed".into())
            .spawn(move || run_event_loop(connection, topics, cache, thread_shutdown))
            .map_err(|e| FeedError::Thread(e.to_string()))?;

        info!("MQTT feed subscribed at {}:{}", config.broker, config.port);
        Ok(Self {
            client,
            shutdown_signal,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Disconnects and joins the event loop thread. Returns the loop's error,
    /// if it failed before shutdown was requested.
    pub fn stop(&mut self) -> Result<(), FeedError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        self.shutdown_signal.store(true, Ordering::SeqCst);
        if let Err(e) = self.client.disconnect() {
            // 事件循环已经退出时请求通道关闭
            debug!("MQTT disconnect request not delivered: {}", e);
        }

        match handle.join() {
            Ok(result) => result,
            Err(_) => Err(FeedError::Thread("MQTT feed thread panicked".to_string())),
        }
    }
}

impl Drop for MqttFeed {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("MQTT feed stopped with error: {}", e);
        }
    }
}

#[derive(Debug, PartialEq)]
enum LoopControl {
    Continue,
    Stop,
}

fn run_event_loop(
    mut connection: Connection,
    topics: TopicMap,
    cache: Arc<SensorChannelCache>,
    shutdown_signal: Arc<AtomicBool>,
) -> Result<(), FeedError> {
    for event in connection.iter() {
        let shutting_down = shutdown_signal.load(Ordering::SeqCst);
        if handle_event(event, &topics, &cache, shutting_down)? == LoopControl::Stop {
            break;
        }
    }
    info!("MQTT feed exiting gracefully");
    Ok(())
}

fn handle_event(
    event: Result<Event, ConnectionError>,
    topics: &[(String, SensorChannel)],
    cache: &SensorChannelCache,
    shutting_down: bool,
) -> Result<LoopControl, FeedError> {
    match event {
        Ok(Event::Incoming(Packet::Publish(publish))) => {
            if let Some(channel) = channel_for_topic(topics, &publish.topic) {
                match SensorUpdate::parse(channel, &publish.payload) {
                    Ok(update) => update.apply(cache),
                    Err(e) => warn!("Invalid {:?} data on {}: {}", channel, publish.topic, e),
                }
            }
            Ok(LoopControl::Continue)
        }
        Ok(Event::Outgoing(Outgoing::Disconnect)) if shutting_down => Ok(LoopControl::Stop),
        Ok(_) => Ok(LoopControl::Continue),
        Err(_) if shutting_down => Ok(LoopControl::Stop),
        Err(e) => {
            error!("MQTT connection error: {}", e);
            Err(e.into())
        }
    }
}

fn channel_for_topic(topics: &[(String, SensorChannel)], topic: &str) -> Option<SensorChannel> {
    topics
        .iter()
        .find(|(name, _)| name == topic)
        .map(|(_, channel)| *channel)
}
