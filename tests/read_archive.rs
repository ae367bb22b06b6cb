//! Reading a complete archive from files and from memory.

mod common;

use abc_decode::core::SampleSelector;
use abc_decode::ogawa::{Archive, BlockGroup, MemGroup, PropertyReader, ReadOptions};
use abc_decode::{Error, PlainOldDataType};
use common::scene;

fn check_scene<G: BlockGroup>(archive: &Archive<G>) {
    assert_eq!(archive.version(), 0);
    assert_eq!(archive.library_version(), 10709);
    assert_eq!(archive.meta_data().get("_ai_Application"), Some("abc-decode tests"));
    assert_eq!(archive.registry().len(), 2);
    assert_eq!(archive.registry().max_samples(1), Some(3));

    let top = archive.top(0).unwrap();
    assert_eq!(top.child_headers().len(), 1);
    assert_eq!(top.child_headers()[0].full_name, "/xform");

    let xform = top.child(0, 0).unwrap();
    assert_eq!(xform.header().schema(), Some("AbcGeom_Xform_v3"));
    let ops = xform.properties(0).unwrap().property(0, 0).unwrap();
    let ops = ops.as_scalar().unwrap();
    assert!(ops.is_constant());
    for index in 0..ops.num_samples() {
        assert_eq!(ops.read_sample(index, 0).unwrap().as_slice::<u8>().unwrap(), &[1, 2, 3, 4]);
    }

    let mesh = archive.find_object("/xform/mesh", 0).unwrap().unwrap();
    assert_eq!(mesh.full_name(), "/xform/mesh");
    assert_eq!(mesh.num_children(), 0);

    let props = mesh.properties(0).unwrap();
    assert_eq!(props.num_properties(), 2);
    let geom = match props.property_by_name(".geom", 0).unwrap() {
        Some(PropertyReader::Compound(geom)) => geom,
        _ => panic!(".geom should be a compound"),
    };
    assert_eq!(geom.header().meta_data.schema(), Some("AbcGeom_PolyMesh_v1"));

    let p = geom.property(0, 0).unwrap();
    let p = p.as_array().unwrap();
    assert_eq!(p.name(), "P");
    assert_eq!(p.header().interpretation(), Some("point"));
    assert_eq!(p.num_samples(), 3);
    assert!((p.time_sampling().sample_time(2) - 0.125).abs() < 1e-12);

    let first = p.read_sample(0, 0).unwrap();
    assert_eq!(first.dims().sizes(), &[2]);
    assert_eq!(first.as_slice::<f32>().unwrap(), &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    let last = p.read_sample(SampleSelector::TimeFloor(1.0), 0).unwrap();
    assert_eq!(last.dims().sizes(), &[3]);
    assert_eq!(last.len(), 9);

    let near = p.read_sample_as(SampleSelector::TimeNear(2.0 / 24.0), PlainOldDataType::Float64, 0).unwrap();
    assert_eq!(near.as_slice::<f64>().unwrap(), &[0.0, 1.0, 0.0, 1.0, 1.0, 0.0]);
    assert_eq!(p.read_dimensions(1, 0).unwrap().sizes(), &[2]);
    assert_eq!(p.sample_key(1, 0).unwrap(), Some([2; 16]));

    let counts = geom.property_by_name(".faceCounts", 0).unwrap().unwrap();
    let counts = counts.as_array().unwrap();
    assert_eq!(counts.read_sample(0, 0).unwrap().as_slice::<i32>().unwrap(), &[3, 4, 300]);
    assert_eq!(
        counts.read_sample_as(0, PlainOldDataType::Uint8, 0).unwrap().as_slice::<u8>().unwrap(),
        &[3, 4, 255]
    );
    assert_eq!(
        counts.read_sample_as(1, PlainOldDataType::Uint16, 0).unwrap().as_slice::<u16>().unwrap(),
        &[0]
    );
    assert!(matches!(
        counts.read_sample_as(0, PlainOldDataType::String, 0),
        Err(Error::InvalidConversion { .. })
    ));

    let names = geom.property(2, 0).unwrap();
    let names = names.as_array().unwrap();
    let sample = names.read_sample(0, 0).unwrap();
    assert_eq!(sample.strings().unwrap(), &["left", "right"]);
    assert_eq!(names.read_dimensions(0, 0).unwrap().sizes(), &[2]);

    let visible = props.property(1, 0).unwrap();
    let visible = visible.as_scalar().unwrap();
    let values: Vec<i8> = (0..4)
        .map(|i| visible.read_sample(i, 0).unwrap().as_slice::<i8>().unwrap()[0])
        .collect();
    assert_eq!(values, vec![1, 0, -1, -1]);
    let as_bool: Vec<u8> = (0..4)
        .map(|i| visible.read_sample_as(i, PlainOldDataType::Boolean, 0).unwrap().as_bytes()[0])
        .collect();
    assert_eq!(as_bool, vec![1, 0, 1, 1]);
    assert!(matches!(
        visible.read_sample(4, 0),
        Err(Error::SampleOutOfBounds { index: 4, count: 4 })
    ));
}

#[test]
fn test_scene_from_memory() {
    let archive = Archive::from_root(scene().to_mem()).unwrap();
    check_scene(&archive);
}

#[test]
fn test_scene_from_file_handles() {
    let file = scene().to_temp_file();
    let options = ReadOptions::default().with_mmap(false).with_thread_slots(2);
    let archive = Archive::open(file.path(), &options).unwrap();
    check_scene(&archive);
}

#[cfg(feature = "mmap")]
#[test]
fn test_scene_from_mapped_file() {
    let file = scene().to_temp_file();
    let archive = Archive::open(file.path(), &ReadOptions::default()).unwrap();
    check_scene(&archive);
}

#[test]
fn test_parallel_read_matches_sequential() {
    let file = scene().to_temp_file();
    let options = ReadOptions::default().with_mmap(false).with_thread_slots(4);
    let archive = Archive::open(file.path(), &options).unwrap();

    let mesh = archive.find_object("/xform/mesh", 0).unwrap().unwrap();
    let geom = mesh.properties(0).unwrap().property(0, 0).unwrap();
    let p = geom.as_compound().unwrap().property(0, 0).unwrap();
    let p = p.as_array().unwrap();

    let parallel = p.read_samples_par(PlainOldDataType::Float64).unwrap();
    let sequential: Vec<_> = (0..p.num_samples())
        .map(|i| p.read_sample_as(i, PlainOldDataType::Float64, 0).unwrap())
        .collect();
    assert_eq!(parallel, sequential);
}

#[test]
fn test_threads_share_one_archive() {
    let file = scene().to_temp_file();
    let options = ReadOptions::default().with_mmap(false).with_thread_slots(3);
    let archive = Archive::open(file.path(), &options).unwrap();

    std::thread::scope(|scope| {
        for slot in 0..3 {
            let archive = &archive;
            scope.spawn(move || {
                for _ in 0..20 {
                    let mesh = archive.find_object("/xform/mesh", slot).unwrap().unwrap();
                    let props = mesh.properties(slot).unwrap();
                    let visible = props.property(1, slot).unwrap();
                    let sample = visible.as_scalar().unwrap().read_sample(3, slot).unwrap();
                    assert_eq!(sample.as_slice::<i8>().unwrap(), &[-1]);
                }
            });
        }
    });
}

#[test]
fn test_corrupt_files() {
    let mut bytes = scene().to_file_bytes();
    bytes[0] = b'X';
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, &bytes).unwrap();
    assert!(matches!(
        Archive::open(file.path(), &ReadOptions::default()),
        Err(Error::InvalidMagic)
    ));

    // root group position past the end of the file
    let mut bytes = scene().to_file_bytes();
    bytes[8..16].copy_from_slice(&u64::MAX.to_le_bytes());
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, &bytes).unwrap();
    assert!(matches!(
        Archive::open(file.path(), &ReadOptions::default()),
        Err(Error::UnexpectedEof(_))
    ));

    assert!(matches!(
        Archive::from_root(MemGroup::new()),
        Err(Error::InvalidStructure(_))
    ));
}

#[test]
fn test_readers_are_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Archive>();
    assert_send_sync::<Archive<MemGroup>>();
    assert_send_sync::<abc_decode::core::TimeSamplingRegistry>();
    assert_send_sync::<abc_decode::ogawa::ArrayPropertyReader<abc_decode::ogawa::IGroup>>();
}
