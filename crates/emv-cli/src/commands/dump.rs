use std::path::Path;

use emv_common::{get_tag_name, Tlv};

use crate::dump_file::CardDump;
use crate::formatters::{self, FormatMode};

/// Print every data object of a card dump as a tree
pub fn run(path: &Path, mode: FormatMode) -> bool {
    let store = match CardDump::load(path).and_then(|dump| dump.store()) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("Failed to load card dump: {}", err);
            return false;
        }
    };

    println!("=== {} ({} data objects) ===\n", path.display(), store.iter().count());
    for tlv in store.roots() {
        print_tlv(tlv, 0, mode);
    }
    true
}

fn print_tlv(tlv: &Tlv, indent: usize, mode: FormatMode) {
    let indent_str = "  ".repeat(indent);
    let tag_name = get_tag_name(tlv.tag());

    if tlv.is_constructed() {
        println!("{}[{:02X}] {}", indent_str, tlv.tag(), tag_name);
        for child in tlv.children() {
            print_tlv(child, indent + 1, mode);
        }
    } else {
        println!(
            "{}[{:02X}] {}: {}",
            indent_str,
            tlv.tag(),
            tag_name,
            formatters::format_value(tlv.tag(), tlv.value(), mode)
        );
    }
}
