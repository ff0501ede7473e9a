//! Styling helpers for the admin REPL.

use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use crossterm::style::{Color as CtColor, Stylize};
use unicode_width::UnicodeWidthStr;

pub fn get_styles() -> Styles {
    clap::builder::Styles::styled()
        .usage(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .header(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .literal(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .invalid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .error(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .valid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

pub fn print_error<S: AsRef<str>>(msg: S) {
    eprintln!("{}", msg.as_ref().with(CtColor::Red));
}

pub fn print_ok<S: AsRef<str>>(msg: S) {
    println!("{}", msg.as_ref().with(CtColor::Green));
}

/// Prints key/value rows with keys padded to a shared column.
pub fn print_kv_table(rows: &[(&str, String)]) {
    let key_width = rows.iter().map(|(key, _)| key.width()).max().unwrap_or(0);
    for (key, value) in rows {
        println!(
            "  {}{}  {}",
            key.with(CtColor::Cyan),
            " ".repeat(key_width - key.width()),
            value
        );
    }
}
