use std::fs;
use std::path::Path;
use std::time::SystemTime;

const PROTO: &str = "proto/profile/v1/profile.proto";
const STUBS: &str = "src/generated/profile.v1.rs";
const DESCRIPTOR: &str = "src/generated/profile_descriptor.bin";
const SERVICE_PATH: &str = "/profile.v1.Profile/";

fn main() {
    for path in [PROTO, STUBS, DESCRIPTOR] {
        println!("cargo:rerun-if-changed={path}");
    }

    let proto = read_text(PROTO);
    let stubs = read_text(STUBS);
    let descriptor = fs::read(DESCRIPTOR).unwrap_or_else(|e| {
        panic!("missing descriptor '{DESCRIPTOR}' ({e}); run scripts/regenerate_descriptor.sh")
    });

    // Every rpc declared in the proto must be routed by the checked-in server.
    let missing: Vec<String> = rpc_names(&proto)
        .map(|name| format!("{SERVICE_PATH}{name}"))
        .filter(|route| !stubs.contains(&format!("\"{route}\"")))
        .collect();
    if !missing.is_empty() {
        panic!("generated stubs '{STUBS}' lack routes {missing:?}; regenerate them");
    }

    let proto_name = PROTO.trim_start_matches("proto/").as_bytes();
    if !descriptor.windows(proto_name.len()).any(|w| w == proto_name) {
        panic!("descriptor '{DESCRIPTOR}' does not describe {PROTO}; run scripts/regenerate_descriptor.sh");
    }

    let proto_mtime = modified(PROTO);
    for artifact in [STUBS, DESCRIPTOR] {
        if let (Some(source), Some(built)) = (proto_mtime, modified(artifact)) {
            if source > built {
                println!("cargo:warning={PROTO} is newer than {artifact}; regenerate it");
            }
        }
    }
}

fn read_text(path: &str) -> String {
    fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("missing '{path}' ({e}); commit generated artifacts"))
}

fn rpc_names(proto: &str) -> impl Iterator<Item = &str> {
    proto.lines().filter_map(|line| {
        let rest = line.trim().strip_prefix("rpc ")?;
        rest.split('(').next().map(str::trim)
    })
}

fn modified(path: &str) -> Option<SystemTime> {
    fs::metadata(Path::new(path)).ok()?.modified().ok()
}
