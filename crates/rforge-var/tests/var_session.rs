use bytes::{BufMut, BytesMut};
use rforge_var::{
    encode_read_request, encode_var_table_binary, parse_read_reply, parse_var_table, DataType,
    MemoryRequest, VarStore, VariableDescriptor,
};

fn device_table() -> Vec<VariableDescriptor> {
    vec![
        VariableDescriptor::new("speed", 0x2000_0000, DataType::Float32).with_unit("rpm"),
        VariableDescriptor::new("temp", 0x2000_0004, DataType::Int16)
            .with_scale(0.1)
            .with_unit("degC"),
        VariableDescriptor::new("status", 0x2000_0008, DataType::UInt8),
    ]
}

#[test]
fn table_then_reads_resolve_to_scaled_values() {
    let store = VarStore::new();
    let table = parse_var_table(&encode_var_table_binary(&device_table()).unwrap()).unwrap();
    store.set_descriptors(table);

    let requests: Vec<_> = store
        .descriptors()
        .iter()
        .map(MemoryRequest::for_descriptor)
        .collect();
    let request = encode_read_request(&requests);
    assert_eq!(request.len(), 18);

    let mut reply = BytesMut::new();
    reply.put_u16_le(3);
    reply.put_u32_le(0x2000_0000);
    reply.put_u16_le(4);
    reply.put_f32_le(1500.0);
    reply.put_u32_le(0x2000_0004);
    reply.put_u16_le(2);
    reply.put_i16_le(-123);
    reply.put_u32_le(0x2000_0008);
    reply.put_u16_le(1);
    reply.put_u8(7);

    let values = parse_read_reply(&reply).unwrap();
    assert_eq!(store.apply_read_reply(&values), 3);

    assert_eq!(store.scaled_value(0x2000_0000), Some(1500.0));
    let temp = store.scaled_value(0x2000_0004).unwrap();
    assert!((temp + 12.3).abs() < 1e-6);
    assert_eq!(store.scaled_value(0x2000_0008), Some(7.0));
}

#[test]
fn text_device_session() {
    let store = VarStore::new();
    store.set_descriptors(
        parse_var_table(b"speed,0x20000000,float32,2,rpm;gain,0x20000010,float32,1,").unwrap(),
    );

    let values = parse_read_reply(b"0x20000000=10.5,0x20000010=0.75").unwrap();
    store.apply_read_reply(&values);

    assert_eq!(store.scaled_value(0x2000_0000), Some(21.0));
    assert_eq!(store.scaled_value(0x2000_0010), Some(0.75));
    let names: Vec<_> = store.readings().into_iter().filter_map(|r| r.name).collect();
    assert_eq!(names, vec!["speed".to_string(), "gain".to_string()]);
}
