#![no_main]

use cortado::ClassFile;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(class) = ClassFile::read(data.to_vec()) else {
        return;
    };
    let pool = class.constant_pool();
    for (handle, _) in pool.iter() {
        let _ = pool.get_any(handle.index());
    }
    let members = class.fields().iter().map(|it| &it.attributes);
    let methods = class.methods().iter().map(|it| &it.attributes);
    for table in members.chain(methods).chain([class.attributes()]) {
        for attribute in table {
            let _ = attribute.parse(pool);
        }
    }
});
