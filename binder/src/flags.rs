use std::path::PathBuf;

xflags::xflags! {
    /// Assemble a book or slide deck from a quire content tree.
    cmd binder {
        /// Directory holding `quire.toml`.
        required input: PathBuf
        /// Directory to write `book.md` and `index.json` into.
        required output: PathBuf
        /// Override the build preset.
        optional -p, --preset preset: String
        /// Override the build edition.
        optional -e, --edition edition: String
        /// Override the output format.
        optional -f, --format format: String
        /// Log debug output.
        optional -v, --verbose
    }
}
