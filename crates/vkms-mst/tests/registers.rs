mod util;

use pretty_assertions::assert_eq;
use util::Probe;
use vkms_mst::aux::{AUX_NATIVE_REPLY_ACK, AUX_NATIVE_REPLY_NACK};
use vkms_mst::dpcd::{
    DPCD_REV, DPCD_REV_14, GUID, GUID_LEN, MSTM_CAP, MSTM_CTRL, MST_CAP, MST_EN,
    PAYLOAD_ALLOCATE_SET, PAYLOAD_TABLE_UPDATED, PAYLOAD_TABLE_UPDATE_STATUS, UP_REQ_EN,
};
use vkms_mst::{
    guid_for_name, AuxChannel, AuxMsg, MstError, MstTopology, PayloadAllocation, ProtocolError,
};

fn hub_only() -> (MstTopology, vkms_mst::DeviceId) {
    let mut topology = MstTopology::new();
    let hub = topology.add_hub("hub", 2).unwrap();
    (topology, hub)
}

#[test]
fn dpcd_rev_is_read_only() {
    let (mut topology, hub) = hub_only();

    let mut write = AuxMsg::native_write(DPCD_REV, &[0x12]);
    assert_eq!(
        topology.transfer(hub, 0, &mut write),
        Err(MstError::Protocol(ProtocolError::UnmappedRegister { address: DPCD_REV }))
    );
    assert_eq!(write.reply, AUX_NATIVE_REPLY_NACK);

    let mut aux = Probe::new(&mut topology, hub, 0);
    assert_eq!(aux.read_dpcd_byte(DPCD_REV).unwrap(), DPCD_REV_14);
}

#[test]
fn mstm_ctrl_reads_back() {
    let (mut topology, hub) = hub_only();
    let mut aux = Probe::new(&mut topology, hub, 0);

    let mut write = AuxMsg::native_write(MSTM_CTRL, &[MST_EN | UP_REQ_EN]);
    assert_eq!(aux.transfer(&mut write), Ok(1));
    assert_eq!(write.reply, AUX_NATIVE_REPLY_ACK);
    assert_eq!(aux.read_dpcd_byte(MSTM_CTRL).unwrap(), MST_EN | UP_REQ_EN);
    assert_eq!(aux.read_dpcd_byte(MSTM_CAP).unwrap(), MST_CAP);
}

#[test]
fn partially_mapped_range_is_rejected_whole() {
    let (mut topology, hub) = hub_only();
    let mut aux = Probe::new(&mut topology, hub, 0);
    aux.write_dpcd(MSTM_CTRL, &[MST_EN]).unwrap();

    // MSTM_CTRL is mapped, the byte after it is not.
    let mut write = AuxMsg::native_write(MSTM_CTRL, &[0, 0xff]);
    assert_eq!(
        aux.transfer(&mut write),
        Err(MstError::Protocol(ProtocolError::UnmappedRegister {
            address: MSTM_CTRL + 1
        }))
    );
    assert_eq!(write.reply, AUX_NATIVE_REPLY_NACK);
    assert_eq!(aux.read_dpcd_byte(MSTM_CTRL).unwrap(), MST_EN);

    let mut read = AuxMsg::native_read(MSTM_CAP - 1, 2);
    assert!(aux.transfer(&mut read).is_err());
    assert_eq!(read.buffer, vec![0, 0]);
}

#[test]
fn guid_is_one_window() {
    let (mut topology, hub) = hub_only();
    let mut aux = Probe::new(&mut topology, hub, 0);
    assert_eq!(aux.read_guid().unwrap(), guid_for_name("hub"));

    let guid = [0x5a; GUID_LEN];
    aux.write_dpcd(GUID, &guid).unwrap();
    assert_eq!(aux.read_guid().unwrap(), guid);
    assert!(aux.write_dpcd(GUID + 8, &[0; GUID_LEN]).is_err());
}

#[test]
fn payload_allocation_over_aux() {
    let (mut topology, hub) = hub_only();
    {
        let mut aux = Probe::new(&mut topology, hub, 0);
        aux.write_dpcd(PAYLOAD_ALLOCATE_SET, &[2, 5, 10]).unwrap();
        assert_eq!(
            aux.read_dpcd_byte(PAYLOAD_TABLE_UPDATE_STATUS).unwrap() & PAYLOAD_TABLE_UPDATED,
            PAYLOAD_TABLE_UPDATED
        );
        aux.write_dpcd(PAYLOAD_TABLE_UPDATE_STATUS, &[PAYLOAD_TABLE_UPDATED])
            .unwrap();
        assert_eq!(aux.read_dpcd_byte(PAYLOAD_TABLE_UPDATE_STATUS).unwrap(), 0);
    }
    assert_eq!(
        topology.device(hub).unwrap().emulator().dpcd.payload_table(),
        &[PayloadAllocation {
            vcpi: 2,
            start_slot: 5,
            slot_count: 10
        }]
    );
}

#[test]
fn hub_has_no_i2c_bus() {
    let (mut topology, hub) = hub_only();
    let mut msg = AuxMsg::i2c_read(0x50, 1).with_mot();
    assert!(matches!(
        topology.transfer(hub, 0, &mut msg),
        Err(MstError::Protocol(ProtocolError::UnsupportedRequest { .. }))
    ));
    assert!(msg.is_nack());
}

#[test]
fn root_has_no_register_file() {
    let mut topology = MstTopology::new();
    let root = topology.add_root("root");
    let mut msg = AuxMsg::native_read(DPCD_REV, 1);
    assert!(topology.transfer(root, 0, &mut msg).is_err());
    assert!(msg.is_nack());
}
