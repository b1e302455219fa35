// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 有界队列 (单生产者/单消费者)
/// Bounded SPSC hand-off queue with timed push/pop
///
/// 基于 crossbeam-channel 的 bounded 通道:
/// - 队列满时生产者阻塞等待, 每次等待有超时, 超时后检查取消标志再重试 (背压)
/// - 结束标记通过 `QueueProducer::finish` 发送, 该方法消费生产者句柄, 每个队列至多一个
use super::control::PlaybackControl;
use super::Packet;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use std::time::Duration;

/// 有界队列, 创建后通过 `split` 拆分为生产端和消费端
pub struct BoundedQueue<T> {
    tx: Sender<Packet<T>>,
    rx: Receiver<Packet<T>>,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self { tx, rx, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn split(self) -> (QueueProducer<T>, QueueConsumer<T>) {
        (
            QueueProducer {
                tx: self.tx,
                capacity: self.capacity,
            },
            QueueConsumer {
                rx: self.rx,
                capacity: self.capacity,
            },
        )
    }
}

/// 入队结果
#[derive(Debug, PartialEq, Eq)]
pub enum PushOutcome {
    Delivered,
    /// 重试期间流水线已停止, 放弃入队
    Cancelled,
    /// 消费端已销毁
    Disconnected,
}

/// 出队结果
#[derive(Debug, PartialEq)]
pub enum Popped<T> {
    Item(T),
    EndOfStream,
    /// 超时无数据 (非错误, 调用者检查状态后重试)
    Empty,
    /// 生产端未发送结束标记就已销毁
    Disconnected,
}

/// 单次入队失败, 数据原样返还
#[derive(Debug, PartialEq)]
pub enum PushError<T> {
    Full(T),
    Disconnected(T),
}

/// 生产端 (不可克隆, 保证单生产者)
pub struct QueueProducer<T> {
    tx: Sender<Packet<T>>,
    capacity: usize,
}

impl<T> QueueProducer<T> {
    /// 入队, 最多等待 `timeout`
    pub fn push(&self, item: T, timeout: Duration) -> Result<(), PushError<T>> {
        match self.tx.send_timeout(Packet::Data(item), timeout) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(Packet::Data(item))) => Err(PushError::Full(item)),
            Err(SendTimeoutError::Disconnected(Packet::Data(item))) => {
                Err(PushError::Disconnected(item))
            }
            // 只发送过 Data
            Err(_) => unreachable!("push only sends Packet::Data"),
        }
    }

    /// 背压入队: 队列满时每隔 `interval` 检查一次流水线状态, 停止后放弃
    pub fn push_with_retry(
        &self,
        item: T,
        control: &PlaybackControl,
        interval: Duration,
    ) -> PushOutcome {
        self.send_with_retry(Packet::Data(item), control, interval)
    }

    /// 发送结束标记, 消费生产端句柄
    pub fn finish(self, control: &PlaybackControl, interval: Duration) -> PushOutcome {
        self.send_with_retry(Packet::EndOfStream, control, interval)
    }

    fn send_with_retry(
        &self,
        mut packet: Packet<T>,
        control: &PlaybackControl,
        interval: Duration,
    ) -> PushOutcome {
        loop {
            if !control.is_running() {
                return PushOutcome::Cancelled;
            }
            match self.tx.send_timeout(packet, interval) {
                Ok(()) => return PushOutcome::Delivered,
                Err(SendTimeoutError::Timeout(p)) => packet = p,
                // 停止后消费端随之退出, 不算异常断开
                Err(SendTimeoutError::Disconnected(_)) if !control.is_running() => {
                    return PushOutcome::Cancelled
                }
                Err(SendTimeoutError::Disconnected(_)) => return PushOutcome::Disconnected,
            }
        }
    }

    /// 当前队列占用
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// 消费端 (不可克隆, 保证单消费者)
pub struct QueueConsumer<T> {
    rx: Receiver<Packet<T>>,
    capacity: usize,
}

impl<T> QueueConsumer<T> {
    /// 出队, 最多等待 `timeout`
    pub fn pop(&self, timeout: Duration) -> Popped<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(Packet::Data(item)) => Popped::Item(item),
            Ok(Packet::EndOfStream) => Popped::EndOfStream,
            Err(RecvTimeoutError::Timeout) => Popped::Empty,
            Err(RecvTimeoutError::Disconnected) => Popped::Disconnected,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    const SHORT: Duration = Duration::from_millis(5);

    #[test]
    fn test_fifo_order() {
        let (tx, rx) = BoundedQueue::new(4).split();
        for i in 0..4 {
            tx.push(i, SHORT).unwrap();
        }
        for i in 0..4 {
            assert_eq!(rx.pop(SHORT), Popped::Item(i));
        }
        assert_eq!(rx.pop(SHORT), Popped::Empty);
    }

    #[test]
    fn test_push_full_returns_item() {
        let (tx, rx) = BoundedQueue::new(2).split();
        tx.push(1, SHORT).unwrap();
        tx.push(2, SHORT).unwrap();
        assert_eq!(tx.push(3, SHORT), Err(PushError::Full(3)));
        assert_eq!(tx.len(), 2);
        assert_eq!(rx.len(), 2);
    }

    #[test]
    fn test_sentinel_is_last_and_unique() {
        let control = PlaybackControl::new();
        let (tx, rx) = BoundedQueue::new(4).split();
        assert_eq!(tx.push_with_retry(7, &control, SHORT), PushOutcome::Delivered);
        assert_eq!(tx.finish(&control, SHORT), PushOutcome::Delivered);

        assert_eq!(rx.pop(SHORT), Popped::Item(7));
        assert_eq!(rx.pop(SHORT), Popped::EndOfStream);
        // 生产端已被 finish 消费, 之后只会看到断开
        assert_eq!(rx.pop(SHORT), Popped::Disconnected);
    }

    #[test]
    fn test_push_with_retry_waits_for_consumer() {
        let control = Arc::new(PlaybackControl::new());
        let (tx, rx) = BoundedQueue::new(1).split();
        tx.push(0, SHORT).unwrap();

        let c = control.clone();
        let producer = thread::spawn(move || tx.push_with_retry(1, &c, SHORT));

        thread::sleep(Duration::from_millis(30));
        assert_eq!(rx.len(), 1, "队列满时不能超出容量");
        assert_eq!(rx.pop(SHORT), Popped::Item(0));

        assert_eq!(producer.join().unwrap(), PushOutcome::Delivered);
        assert_eq!(rx.pop(Duration::from_millis(100)), Popped::Item(1));
    }

    #[test]
    fn test_push_with_retry_abandons_on_stop() {
        let control = Arc::new(PlaybackControl::new());
        let (tx, rx) = BoundedQueue::new(1).split();
        tx.push(0, SHORT).unwrap();

        let c = control.clone();
        let interval = Duration::from_millis(20);
        let producer = thread::spawn(move || tx.push_with_retry(1, &c, interval));

        thread::sleep(Duration::from_millis(50));
        let stopped_at = Instant::now();
        control.stop();
        assert_eq!(producer.join().unwrap(), PushOutcome::Cancelled);
        assert!(stopped_at.elapsed() < interval * 5);

        assert_eq!(rx.pop(SHORT), Popped::Item(0));
    }

    #[test]
    fn test_push_after_consumer_dropped() {
        let control = PlaybackControl::new();
        let (tx, rx) = BoundedQueue::<u32>::new(1).split();
        drop(rx);
        assert_eq!(tx.push_with_retry(1, &control, SHORT), PushOutcome::Disconnected);
        assert_eq!(tx.finish(&control, SHORT), PushOutcome::Disconnected);
    }

    #[test]
    fn test_finish_after_stop_is_cancelled() {
        let control = PlaybackControl::new();
        let (tx, rx) = BoundedQueue::<u32>::new(1).split();
        control.stop();
        assert_eq!(tx.finish(&control, SHORT), PushOutcome::Cancelled);
        assert_eq!(rx.pop(SHORT), Popped::Disconnected);
    }
}
