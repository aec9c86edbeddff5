use rforge_stream::{
    decode_payload, encode_binary, encode_text, AggregatorConfig, ChannelValue, DataAggregator,
    DataFrame,
};

#[test]
fn mixed_payloads_feed_the_aggregator() {
    let agg = DataAggregator::with_config(AggregatorConfig {
        capacity: 8,
        ..AggregatorConfig::default()
    });

    for i in 0..12u64 {
        let frame = DataFrame::new(
            i * 1_000,
            vec![ChannelValue::new(0, i as f64), ChannelValue::new(1, -(i as f64))],
        );
        let payload = if i % 2 == 0 {
            encode_binary(&frame)
        } else {
            encode_text(&frame)
        };
        let decoded = decode_payload(&payload, Some(i * 1_000)).unwrap();
        assert_eq!(decoded, frame);
        agg.append(decoded);
    }

    assert_eq!(agg.len(), 8);
    let stats = agg.channel_stats(1, 4).unwrap();
    assert_eq!(stats.sample_count, 4);
    assert_eq!(stats.mean, -9.5);
    assert_eq!(stats.peak_to_peak, 3.0);
}

#[tokio::test]
async fn late_subscriber_sees_only_new_frames() {
    let agg = DataAggregator::new();
    agg.append(DataFrame::from_values(1, [1.0]));

    let mut rx = agg.subscribe();
    agg.append(DataFrame::from_values(2, [2.0]));

    assert_eq!(rx.recv().await.unwrap().timestamp_us, 2);
    assert!(rx.try_recv().is_err());
    assert_eq!(agg.recent(10).len(), 2);
}
