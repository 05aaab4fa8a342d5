use crate::errors::{SensorError, SensorResult};
use crate::registry::RegisteredSensor;
use crate::sensors::{SensorDataFrame, SensorDriver};
use serde::Serialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// A frame stamped by the poller that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// Per-sensor sequence number, starts at 1
    pub seq: u64,
    /// UTC timestamp in nanoseconds
    pub t_utc_ns: u64,
    pub frame: SensorDataFrame,
}

impl Sample {
    pub fn new(seq: u64, frame: SensorDataFrame) -> Self {
        let t_utc_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        Self {
            seq,
            t_utc_ns,
            frame,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Read side of a poller: holds only the most recent sample
#[derive(Clone)]
pub struct SampleCache {
    sensor: String,
    rx: watch::Receiver<Option<Sample>>,
}

impl SampleCache {
    pub fn sensor(&self) -> &str {
        &self.sensor
    }

    /// Most recent sample, if any has been taken yet
    pub fn latest(&self) -> Option<Sample> {
        self.rx.borrow().clone()
    }

    /// Most recent sample, waiting for the first one if needed
    pub async fn sample(&mut self) -> SensorResult<Sample> {
        if let Some(sample) = self.latest() {
            return Ok(sample);
        }
        let stopped = || SensorError::PollerStopped {
            sensor: self.sensor.clone(),
        };
        let current = self
            .rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| stopped())?;
        current.as_ref().cloned().ok_or_else(stopped)
    }
}

/// Owner side of a running poller. Dropping it stops the task.
pub struct PollerHandle {
    cache: SampleCache,
    quit: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn sensor(&self) -> &str {
        self.cache.sensor()
    }

    pub fn cache(&self) -> SampleCache {
        self.cache.clone()
    }

    /// Stop polling and wait for the task to finish
    pub async fn close(mut self) {
        if let Some(quit) = self.quit.take() {
            let _ = quit.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!("[{}] sensor task ended abnormally: {}", self.cache.sensor, e);
        }
    }
}

/// Floor for the poll period when neither the caller nor the driver gives one
const MIN_POLL_PERIOD: Duration = Duration::from_millis(1);

/// Spawn one task that owns `driver` and reads it every `period`.
///
/// Failed reads are logged and leave the previous sample in place. A zero
/// `period` is replaced by the driver's default poll interval.
pub fn spawn_poller(id: String, driver: Box<dyn SensorDriver>, period: Duration) -> PollerHandle {
    let period = if period.is_zero() {
        let fallback = driver.default_poll_interval().max(MIN_POLL_PERIOD);
        warn!("[{}] zero poll period, using {:?} instead", id, fallback);
        fallback
    } else {
        period
    };
    let (tx, rx) = watch::channel(None);
    let (quit_tx, mut quit_rx) = oneshot::channel::<()>();
    let sensor_id = id.clone();

    let task = tokio::spawn(async move {
        info!(
            "[{}] starting {} sensor task every {:?}",
            sensor_id,
            driver.name(),
            period
        );
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut seq = 0u64;

        loop {
            tokio::select! {
                _ = &mut quit_rx => break,
                _ = ticker.tick() => {
                    match driver.read_frame().await {
                        Ok(frame) => {
                            seq += 1;
                            debug!("[{}] sample {}: {:?}", sensor_id, seq, frame);
                            tx.send_replace(Some(Sample::new(seq, frame)));
                        }
                        Err(e) => {
                            warn!("[{}] sensor read error: {}", sensor_id, e);
                        }
                    }
                }
            }
        }
        info!("[{}] sensor task stopped after {} samples", sensor_id, seq);
    });

    PollerHandle {
        cache: SampleCache { sensor: id, rx },
        quit: Some(quit_tx),
        task,
    }
}

pub(crate) fn poll_period(frequency: Option<u32>, driver: &dyn SensorDriver) -> Duration {
    match frequency {
        Some(hz) if hz > 0 => Duration::from_secs_f64(1.0 / f64::from(hz)),
        _ => driver.default_poll_interval(),
    }
}

/// Start a poller for every registered sensor
pub fn spawn_sensor_tasks(sensors: Vec<RegisteredSensor>) -> Vec<PollerHandle> {
    sensors
        .into_iter()
        .map(|sensor| {
            let period = poll_period(sensor.frequency, sensor.driver.as_ref());
            debug!("[scheduler] {} on bus {} every {:?}", sensor.id, sensor.bus, period);
            spawn_poller(sensor.id, sensor.driver, period)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tokio::time::sleep;

    const PERIOD: Duration = Duration::from_millis(100);

    /// Reports the read count as humidity; fails on the listed reads
    struct CountingDriver {
        reads: Arc<AtomicU64>,
        failing: Vec<u64>,
    }

    impl CountingDriver {
        fn new(failing: Vec<u64>) -> (Self, Arc<AtomicU64>) {
            let reads = Arc::new(AtomicU64::new(0));
            (
                Self {
                    reads: reads.clone(),
                    failing,
                },
                reads,
            )
        }
    }

    #[async_trait]
    impl SensorDriver for CountingDriver {
        async fn read_frame(&self) -> SensorResult<SensorDataFrame> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
            if self.failing.contains(&n) {
                return Err(SensorError::BusNotFound {
                    bus: "test".to_string(),
                });
            }
            Ok(SensorDataFrame {
                humidity: Some(n as f64),
                ..Default::default()
            })
        }

        fn name(&self) -> &'static str {
            "counting"
        }

        fn default_poll_interval(&self) -> Duration {
            Duration::from_millis(250)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_waits_for_first_reading() {
        let (driver, _) = CountingDriver::new(vec![]);
        let handle = spawn_poller("s0".to_string(), Box::new(driver), PERIOD);
        let mut cache = handle.cache();

        let sample = cache.sample().await.unwrap();
        assert_eq!(sample.seq, 1);
        assert_eq!(sample.frame.humidity, Some(1.0));
        assert_eq!(cache.sensor(), "s0");

        handle.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_holds_only_newest_sample() {
        let (driver, reads) = CountingDriver::new(vec![]);
        let handle = spawn_poller("s0".to_string(), Box::new(driver), PERIOD);
        let cache = handle.cache();

        sleep(PERIOD * 3 + PERIOD / 2).await;

        let latest = cache.latest().unwrap();
        assert!(latest.seq >= 3);
        assert_eq!(latest.seq, reads.load(Ordering::SeqCst));
        assert_eq!(latest.frame.humidity, Some(latest.seq as f64));

        handle.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_read_keeps_previous_sample() {
        let (driver, reads) = CountingDriver::new(vec![2]);
        let handle = spawn_poller("s0".to_string(), Box::new(driver), PERIOD);
        let mut cache = handle.cache();

        cache.sample().await.unwrap();
        sleep(PERIOD + PERIOD / 2).await;

        assert_eq!(reads.load(Ordering::SeqCst), 2);
        let latest = cache.latest().unwrap();
        assert_eq!(latest.seq, 1);
        assert_eq!(latest.frame.humidity, Some(1.0));

        handle.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiters_see_stopped_poller() {
        let (driver, _) = CountingDriver::new((1..=100).collect());
        let handle = spawn_poller("s0".to_string(), Box::new(driver), PERIOD);
        let mut cache = handle.cache();

        handle.close().await;

        match cache.sample().await {
            Err(SensorError::PollerStopped { sensor }) => assert_eq!(sensor, "s0"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_falls_back_to_driver_default() {
        let (driver, reads) = CountingDriver::new(vec![]);
        let handle = spawn_poller("s0".to_string(), Box::new(driver), Duration::ZERO);
        let mut cache = handle.cache();

        // first tick is immediate, the next one follows the 250 ms default
        cache.sample().await.unwrap();
        sleep(Duration::from_millis(100)).await;
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        sleep(Duration::from_millis(200)).await;
        assert_eq!(reads.load(Ordering::SeqCst), 2);

        handle.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_sensor_tasks_uses_each_frequency() {
        let (fast, fast_reads) = CountingDriver::new(vec![]);
        let (slow, slow_reads) = CountingDriver::new(vec![]);
        let sensors = vec![
            RegisteredSensor {
                id: "fast".to_string(),
                bus: "i2c1".to_string(),
                frequency: Some(10),
                driver: Box::new(fast),
            },
            RegisteredSensor {
                id: "slow".to_string(),
                bus: "i2c1".to_string(),
                frequency: None,
                driver: Box::new(slow),
            },
        ];

        let handles = spawn_sensor_tasks(sensors);
        assert_eq!(handles[0].sensor(), "fast");
        assert_eq!(handles[1].sensor(), "slow");

        sleep(Duration::from_millis(450)).await;
        assert_eq!(fast_reads.load(Ordering::SeqCst), 5);
        assert_eq!(slow_reads.load(Ordering::SeqCst), 2);

        for handle in handles {
            handle.close().await;
        }
    }

    #[test]
    fn test_poll_period_prefers_configured_frequency() {
        let (driver, _) = CountingDriver::new(vec![]);
        assert_eq!(poll_period(Some(50), &driver), Duration::from_millis(20));
        assert_eq!(poll_period(None, &driver), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_json_has_frame_fields() {
        let (driver, _) = CountingDriver::new(vec![]);
        let handle = spawn_poller("s0".to_string(), Box::new(driver), PERIOD);

        let json = handle.cache().sample().await.unwrap().to_json().unwrap();
        assert!(json.contains("\"seq\":1"));
        assert!(json.contains("\"humidity\":1.0"));
        assert!(json.contains("\"accel\":null"));

        handle.close().await;
    }
}
