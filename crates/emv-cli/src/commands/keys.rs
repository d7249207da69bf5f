use emv_ca_keys::{CaKey, KeyRegistry};

use crate::formatters::FormatMode;

use super::describe_key;

/// List the registry, optionally restricted to one RID
pub fn run(registry: &KeyRegistry, rid: Option<&str>, mode: FormatMode) -> bool {
    let rid = match rid.map(hex::decode).transpose() {
        Ok(rid) => rid,
        Err(err) => {
            eprintln!("Invalid RID: {}", err);
            return false;
        }
    };

    let keys: Vec<&CaKey> = match &rid {
        Some(rid) => registry.keys_for_rid(rid).collect(),
        None => registry.iter().collect(),
    };

    if keys.is_empty() {
        println!("No CA public keys found");
        return true;
    }

    println!("{} CA public key(s):\n", keys.len());
    for CaKey { scheme, key } in keys {
        println!(
            "  {:<12} RID {}  Index {:02X}  Check {}  {}",
            scheme,
            hex::encode_upper(key.rid()),
            key.index(),
            hex::encode_upper(key.check_value()),
            describe_key(key, mode)
        );
    }
    true
}
