use relayq::queue::{Message, MessageQueue, WaiterRegistry};
use relayq::BrokerError;
use tokio::sync::oneshot;

#[test]
fn test_message_queue_creation() {
    let queue = MessageQueue::new(100);

    assert_eq!(queue.capacity(), 100);
    assert_eq!(queue.len(), 0);
    assert!(queue.is_empty());
    assert!(!queue.is_full());
}

#[test]
fn test_enqueue_then_dequeue_single_message() {
    let mut queue = MessageQueue::new(10);

    queue.enqueue(Message::new("data")).unwrap();
    assert_eq!(queue.len(), 1);

    let message = queue.dequeue().unwrap();
    assert_eq!(&message.payload[..], b"data");
    assert!(queue.is_empty());
}

#[test]
fn test_message_records_enqueue_time() {
    let message = Message::new("data");

    assert!(message.enqueued_at > 0);
    assert_eq!(message.len(), 4);
}

#[test]
fn test_dequeue_preserves_fifo_order() {
    let mut queue = MessageQueue::new(10);

    for i in 0..5 {
        queue.enqueue(Message::new(format!("msg-{i}"))).unwrap();
    }

    for i in 0..5 {
        let message = queue.dequeue().unwrap();
        assert_eq!(message.payload, format!("msg-{i}").into_bytes());
    }
}

#[test]
fn test_dequeue_empty_queue_returns_none() {
    let mut queue = MessageQueue::new(10);

    assert!(queue.dequeue().is_none());
}

#[test]
fn test_enqueue_full_queue_returns_error() {
    let mut queue = MessageQueue::new(2);

    queue.enqueue(Message::new("1")).unwrap();
    queue.enqueue(Message::new("2")).unwrap();

    let result = queue.enqueue(Message::new("3"));

    assert!(matches!(result, Err(BrokerError::QueueFull { capacity: 2 })));
    assert_eq!(queue.len(), 2);
    assert!(queue.is_full());
}

#[test]
fn test_enqueue_after_dequeue_frees_slot() {
    let mut queue = MessageQueue::new(1);

    queue.enqueue(Message::new("first")).unwrap();
    assert!(queue.enqueue(Message::new("second")).is_err());

    queue.dequeue().unwrap();
    assert!(queue.enqueue(Message::new("second")).is_ok());
}

#[test]
fn test_requeue_front_is_delivered_next() {
    let mut queue = MessageQueue::new(3);

    queue.enqueue(Message::new("later")).unwrap();
    queue.requeue_front(Message::new("returned")).unwrap();

    assert_eq!(&queue.dequeue().unwrap().payload[..], b"returned");
    assert_eq!(&queue.dequeue().unwrap().payload[..], b"later");
}

#[test]
fn test_requeue_front_respects_capacity() {
    let mut queue = MessageQueue::new(1);

    queue.enqueue(Message::new("held")).unwrap();
    let rejected = queue.requeue_front(Message::new("returned")).unwrap_err();

    assert_eq!(&rejected.payload[..], b"returned");
    assert_eq!(queue.len(), 1);
}

#[tokio::test]
async fn test_waiters_served_oldest_first() {
    let mut registry = WaiterRegistry::new();
    let mut receivers = Vec::new();

    for _ in 0..3 {
        let (tx, rx) = oneshot::channel();
        registry.register(tx);
        receivers.push(rx);
    }
    assert_eq!(registry.len(), 3);

    for i in 0..3 {
        let waiter = registry.take_oldest().unwrap();
        waiter.deliver(Message::new(format!("m{i}"))).unwrap();
    }
    assert!(registry.is_empty());

    for (i, rx) in receivers.into_iter().enumerate() {
        let message = rx.await.unwrap();
        assert_eq!(message.payload, format!("m{i}").into_bytes());
    }
}

#[test]
fn test_remove_waiter_by_id() {
    let mut registry = WaiterRegistry::new();
    let (tx1, _rx1) = oneshot::channel();
    let (tx2, _rx2) = oneshot::channel();
    let first = registry.register(tx1);
    let second = registry.register(tx2);

    assert!(registry.remove(first));
    assert!(!registry.remove(first));
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.take_oldest().unwrap().id(), second);
}

#[test]
fn test_deliver_to_closed_waiter_returns_message() {
    let mut registry = WaiterRegistry::new();
    let (tx, rx) = oneshot::channel();
    registry.register(tx);
    drop(rx);

    let waiter = registry.take_oldest().unwrap();
    let returned = waiter.deliver(Message::new("orphan")).unwrap_err();
    assert_eq!(&returned.payload[..], b"orphan");
}
