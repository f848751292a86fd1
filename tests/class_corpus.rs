use std::path::PathBuf;

use cortado::ClassFile;
use rayon::prelude::*;

/// Decodes every `.class` file under the directory named by `CORTADO_CLASS_DIR`, e.g. the
/// output of `jimage extract` on a JDK module image.
#[test]
#[ignore = "Needs a directory of class files"]
fn decode_class_corpus() {
    let root = PathBuf::from(std::env::var("CORTADO_CLASS_DIR").unwrap());
    let class_files: Vec<_> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|it| it.path().extension().is_some_and(|it| it == "class"))
        .map(walkdir::DirEntry::into_path)
        .collect();

    class_files.into_par_iter().for_each(|path| {
        let class = match ClassFile::from_path(&path) {
            Ok(class) => class,
            Err(e) => panic!("Failed to decode {}: {e}", path.display()),
        };
        let pool = class.constant_pool();
        for method in class.methods() {
            for attribute in &method.attributes {
                if let Err(e) = attribute.parse(pool) {
                    panic!("Failed to parse an attribute in {}: {e}", path.display());
                }
            }
        }
    });
}
