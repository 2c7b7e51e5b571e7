//! Additional scenario 13: `package ... use ...` copies only the named
//! public symbols into the importing scope; a bare `package` copies every
//! public symbol and no private ones.

use lapis::eval_to_string;

struct TempModule {
    path: std::path::PathBuf,
}

impl TempModule {
    fn write(unique: &str, content: &str) -> Self {
        let path = std::env::temp_dir().join(format!("lapis_import_test_{unique}_{}.lapis", std::process::id()));
        std::fs::write(&path, content).unwrap();
        Self { path }
    }

    fn path_literal(&self) -> String {
        self.path.to_string_lossy().replace('\\', "\\\\")
    }
}

impl Drop for TempModule {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[test]
fn use_clause_imports_a_named_public_symbol() {
    let module = TempModule::write("named", "public var x = 5; private var y = 6;");
    let src = format!("package \"{}\" use x; x;", module.path_literal());
    assert_eq!(eval_to_string(&src), "5");
}

#[test]
fn use_clause_rejects_a_private_symbol() {
    let module = TempModule::write("private_use", "public var x = 5; private var y = 6;");
    let src = format!("package \"{}\" use y; y;", module.path_literal());
    let output = eval_to_string(&src);
    assert!(output.starts_with("error [LAP4003]"), "got: {output}");
}

#[test]
fn bare_package_copies_every_public_symbol() {
    let module = TempModule::write("bare", "public var x = 5; public var z = 7; private var y = 6;");
    let src = format!("package \"{}\"; x + z;", module.path_literal());
    assert_eq!(eval_to_string(&src), "12");
}

#[test]
fn bare_package_does_not_copy_private_symbols() {
    let module = TempModule::write("bare_private", "public var x = 5; private var y = 6;");
    let src = format!("package \"{}\"; y;", module.path_literal());
    assert!(eval_to_string(&src).starts_with("error [LAP4001]"));
}

#[test]
fn reimporting_the_same_module_reuses_its_globals() {
    let module = TempModule::write("reimport", "public var x = 5;");
    let src = format!(
        "package \"{0}\" use x; package \"{0}\" use x; x;",
        module.path_literal()
    );
    assert_eq!(eval_to_string(&src), "5");
}
