pub mod csv;
pub mod json;
pub mod table;

use serde::Serialize;

/// Print `value` as JSON or as the text table `render` produces.
pub fn print<T: Serialize>(value: &T, json_output: bool, render: impl Fn(&T) -> String) {
    if json_output {
        println!("{}", json::render(value));
    } else {
        print!("{}", render(value));
    }
}
