// Unit tests for the transmission buffer and the pacing policy.

use speechwire::client::{PaceStep, Pacer, TransmissionBuffer, CHUNK_SIZE};

#[test]
fn test_buffer_fifo_order() {
    let mut buffer = TransmissionBuffer::new();
    buffer.append(&[1, 2, 3]);
    buffer.append(&[4, 5]);
    assert_eq!(buffer.len(), 5);
    assert_eq!(buffer.drain(10), vec![1, 2, 3, 4, 5]);
    assert!(buffer.is_empty());
}

#[test]
fn test_buffer_drain_partial() {
    let mut buffer = TransmissionBuffer::new();
    buffer.append(&[1, 2, 3, 4, 5]);
    assert_eq!(buffer.drain(2), vec![1, 2]);
    assert_eq!(buffer.drain(2), vec![3, 4]);
    assert_eq!(buffer.drain(2), vec![5]);
    assert_eq!(buffer.drain(2), Vec::<u8>::new());
}

#[test]
fn test_buffer_drain_partition_invariance() {
    // Any partition into n-byte drains yields the same bytes in the same
    // order as one big drain
    let data: Vec<u8> = (0..=255).cycle().take(7000).collect();

    for n in [1usize, 7, 100, 2048, 7000, 9000] {
        let mut whole = TransmissionBuffer::new();
        whole.append(&data);
        let expected = whole.drain(data.len());

        let mut chunked = TransmissionBuffer::new();
        chunked.append(&data);
        let mut collected = Vec::new();
        loop {
            let slice = chunked.drain(n);
            if slice.is_empty() {
                break;
            }
            collected.extend(slice);
        }

        assert_eq!(collected, expected, "partition size {} changed the stream", n);
    }
}

#[test]
fn test_pacer_sends_while_buffer_has_data() {
    let mut pacer = Pacer::new();
    let mut buffer = TransmissionBuffer::new();
    buffer.append(&vec![7u8; CHUNK_SIZE + 10]);

    match pacer.step(&mut buffer, false) {
        PaceStep::Send(slice) => assert_eq!(slice.len(), CHUNK_SIZE),
        other => panic!("expected Send, got {:?}", other),
    }
    match pacer.step(&mut buffer, false) {
        PaceStep::Send(slice) => assert_eq!(slice.len(), 10),
        other => panic!("expected Send, got {:?}", other),
    }
    assert_eq!(pacer.step(&mut buffer, false), PaceStep::Idle);
}

#[test]
fn test_pacer_idle_when_empty_and_running() {
    let mut pacer = Pacer::new();
    let mut buffer = TransmissionBuffer::new();
    assert_eq!(pacer.step(&mut buffer, false), PaceStep::Idle);
    assert_eq!(pacer.step(&mut buffer, false), PaceStep::Idle);
}

#[test]
fn test_pacer_finishes_exactly_once_after_stop() {
    let mut pacer = Pacer::new();
    let mut buffer = TransmissionBuffer::new();
    buffer.append(&[1, 2, 3]);

    // Remaining audio still drains after stop
    match pacer.step(&mut buffer, true) {
        PaceStep::Send(slice) => assert_eq!(slice, vec![1, 2, 3]),
        other => panic!("expected Send, got {:?}", other),
    }
    assert_eq!(pacer.step(&mut buffer, true), PaceStep::Finish);
    // Never a second terminal marker
    assert_eq!(pacer.step(&mut buffer, true), PaceStep::Idle);
    assert_eq!(pacer.step(&mut buffer, true), PaceStep::Idle);
}
