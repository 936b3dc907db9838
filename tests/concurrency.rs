use std::sync::Arc;
use std::thread;

use rand::prelude::*;

use d7vfs::testing::MemoryPeers;
use d7vfs::*;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn setup(devices: u32) -> (Arc<Vfs<MemoryPeers>>, FsHandle) {
    init_logger();
    let vfs = Vfs::new(VfsConfig::default(), MemoryPeers::new()).unwrap();
    let fs = vfs.register("demofs").unwrap();
    for dev in 1..=devices {
        let pair = FsDevPair::new(fs, DevHandle::from_u32(dev));
        vfs.transport().add_device(pair);
        vfs.transport().create(pair, "/mnt/data").unwrap();
        vfs.transport().create(pair, "/etc").unwrap();
    }
    (Arc::new(vfs), fs)
}

#[test]
fn test_concurrent_root_mounts() {
    const THREADS: u32 = 8;
    let (vfs, fs) = setup(THREADS);

    let handles: Vec<_> = (1..=THREADS)
        .map(|dev| {
            let vfs = vfs.clone();
            thread::spawn(move || vfs.mount(DevHandle::from_u32(dev), "demofs", "/"))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // Exactly one mount set the root, every other one either
    // covered it or lost a race for the same mount point
    let root = vfs.root().expect("Root not set");
    assert_eq!(root.fs_handle, fs);
    let ok = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(ok, 1 + vfs.mount_points().len());
    for r in &results {
        assert!(matches!(r, Ok(()) | Err(VfsError::InvalidArgument)));
    }
    assert_eq!(vfs.nodes().refcount_sum(), 1 + 2 * vfs.mount_points().len());
}

#[test]
fn test_balanced_lookups() {
    const THREADS: usize = 6;
    const ROUNDS: usize = 200;
    let (vfs, _) = setup(2);
    vfs.mount(DevHandle::from_u32(1), "demofs", "/").unwrap();
    vfs.mount(DevHandle::from_u32(2), "demofs", "/mnt").unwrap();
    let baseline = vfs.nodes().refcount_sum();
    let cached = vfs.nodes().len();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let vfs = vfs.clone();
            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                let paths = ["/", "/etc", "/mnt", "/mnt/etc", "/mnt/mnt/data"];
                let mut held = Vec::new();
                for _ in 0..ROUNDS {
                    let path = paths.choose(&mut rng).unwrap();
                    held.push(vfs.lookup(path, LookupFlags::empty()).unwrap());
                    if rng.gen_bool(0.5) {
                        held.shuffle(&mut rng);
                        vfs.put(held.pop().unwrap());
                    }
                }
                for node in held {
                    vfs.put(node);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(vfs.nodes().refcount_sum(), baseline);
    assert_eq!(vfs.nodes().len(), cached);
}

#[test]
fn test_lookups_during_mount() {
    let (vfs, fs) = setup(2);
    let peers = vfs.transport();
    let pair = FsDevPair::new(fs, DevHandle::from_u32(2));
    let marker = peers.create(pair, "/marker").unwrap();
    vfs.mount(DevHandle::from_u32(1), "demofs", "/").unwrap();

    let reader = {
        let vfs = vfs.clone();
        thread::spawn(move || {
            let mut seen = 0;
            while seen < 1000 {
                // Either the mount is not visible yet, or fully visible
                match vfs.resolve("/mnt/marker", None) {
                    Ok(r) => {
                        assert_eq!(r.triplet, marker);
                        seen += 1;
                    },
                    Err(e) => assert_eq!(e, VfsError::NotFound),
                }
                thread::yield_now();
            }
        })
    };

    vfs.mount(DevHandle::from_u32(2), "demofs", "/mnt").unwrap();
    reader.join().unwrap();
}

#[test]
fn test_concurrent_mount_unmount() {
    const THREADS: u32 = 4;
    let (vfs, fs) = setup(THREADS + 1);
    vfs.mount(DevHandle::from_u32(THREADS + 1), "demofs", "/").unwrap();
    let root_pair = FsDevPair::new(fs, DevHandle::from_u32(THREADS + 1));
    for dev in 1..=THREADS {
        vfs.transport()
            .create(root_pair, &format!("/dir{}", dev))
            .unwrap();
    }

    let handles: Vec<_> = (1..=THREADS)
        .map(|dev| {
            let vfs = vfs.clone();
            thread::spawn(move || {
                let path = format!("/dir{}", dev);
                for _ in 0..50 {
                    vfs.mount(DevHandle::from_u32(dev), "demofs", &path)
                        .unwrap();
                    let data = vfs
                        .resolve(&format!("{}/mnt/data", path), None)
                        .unwrap();
                    assert_eq!(data.triplet.dev_handle, DevHandle::from_u32(dev));
                    vfs.unmount(&path).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert!(vfs.mount_points().is_empty());
    assert_eq!(vfs.nodes().refcount_sum(), 1);
    assert_eq!(vfs.nodes().len(), 1);
}
