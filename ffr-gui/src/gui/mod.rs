//! 图形用户界面模块
//!
//! 基于egui/eframe的运行表单：填写参数后在后台运行 ffrcheck，
//! 输出逐行显示在控制台区域。

use std::path::PathBuf;
use std::time::Duration;

use eframe::egui;
use log::info;

use crate::command::{display_command, RunForm};
use crate::runner::{ffrcheck_program, RunEvent, RunHandle};

/// 控制台最多保留的行数
const MAX_CONSOLE_LINES: usize = 5000;

pub struct GuiApp {
    form: RunForm,
    program: PathBuf,
    console: Vec<String>,
    running: Option<RunHandle>,
    status: String,
}

impl Default for GuiApp {
    fn default() -> Self {
        Self::new()
    }
}

impl GuiApp {
    pub fn new() -> Self {
        Self {
            form: RunForm::default(),
            program: ffrcheck_program(),
            console: Vec::new(),
            running: None,
            status: "Ready".to_string(),
        }
    }

    fn push_line(&mut self, line: String) {
        self.console.push(line);
        if self.console.len() > MAX_CONSOLE_LINES {
            let excess = self.console.len() - MAX_CONSOLE_LINES;
            self.console.drain(..excess);
        }
    }

    fn start(&mut self) {
        let args = match self.form.build_args() {
            Ok(args) => args,
            Err(e) => {
                self.status = e.to_string();
                return;
            }
        };

        let program = self.program.display().to_string();
        let command = display_command(&program, &args);
        info!("Running {command}");
        self.push_line(format!("Command: {command}"));
        match RunHandle::spawn(&self.program, &args) {
            Ok(handle) => {
                self.running = Some(handle);
                self.status = "Running...".to_string();
            }
            Err(e) => {
                self.push_line(format!("Failed to start {program}: {e}"));
                self.status = "Failed to start".to_string();
            }
        }
    }

    fn stop(&mut self) {
        if let Some(handle) = &self.running {
            handle.stop();
            self.status = "Stopping...".to_string();
        }
    }

    /// 读取后台事件，子进程结束时清除运行状态
    fn drain_events(&mut self) {
        let Some(handle) = &self.running else {
            return;
        };
        let mut finished = false;
        for event in handle.poll() {
            match event {
                RunEvent::Line(line) => self.push_line(line),
                RunEvent::Finished(code) => {
                    self.status = match code {
                        Some(0) => "Completed".to_string(),
                        Some(code) => format!("Exited with code {code}"),
                        None => "Stopped".to_string(),
                    };
                    self.push_line(format!("[{}]", self.status));
                    finished = true;
                }
                RunEvent::Failed(message) => {
                    self.status = format!("Failed: {message}");
                    self.push_line(self.status.clone());
                    finished = true;
                }
            }
        }
        if finished {
            self.running = None;
        }
    }

    fn form_ui(&mut self, ui: &mut egui::Ui) {
        let form = &mut self.form;
        egui::Grid::new("run_form")
            .num_columns(2)
            .spacing([12.0, 6.0])
            .show(ui, |ui| {
                for (label, value) in [
                    ("Input directory", &mut form.input_dir),
                    ("Output directory", &mut form.output_dir),
                    ("QDFs (sspec)", &mut form.sspec),
                    ("UBE file", &mut form.ube),
                    ("MTL_OLF file", &mut form.mtlolf),
                    ("ITF directory", &mut form.ituff),
                    ("Visual ID filter", &mut form.visualid),
                ] {
                    ui.label(label);
                    ui.add(egui::TextEdit::singleline(value).desired_width(480.0));
                    ui.end_row();
                }
            });
        ui.horizontal(|ui| {
            ui.checkbox(&mut form.log, "Console log file");
            ui.checkbox(&mut form.html_stats, "HTML statistics");
        });
    }
}

impl eframe::App for GuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();
        if self.running.is_some() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        egui::TopBottomPanel::top("form").show(ctx, |ui| {
            ui.heading("FFR Check");
            self.form_ui(ui);

            ui.horizontal(|ui| {
                let running = self.running.is_some();
                if ui.add_enabled(!running, egui::Button::new("Run")).clicked() {
                    self.start();
                }
                if ui.add_enabled(running, egui::Button::new("Stop")).clicked() {
                    self.stop();
                }
                if ui.button("Clear").clicked() {
                    self.console.clear();
                }
                ui.label(&self.status);
            });
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .stick_to_bottom(true)
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    for line in &self.console {
                        ui.monospace(line);
                    }
                });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_without_input_dir() {
        let mut app = GuiApp::new();
        app.start();
        assert!(app.running.is_none());
        assert_eq!(app.status, "Input directory is required");
        assert!(app.console.is_empty());
    }

    #[test]
    fn test_console_is_bounded() {
        let mut app = GuiApp::new();
        for i in 0..MAX_CONSOLE_LINES + 10 {
            app.push_line(i.to_string());
        }
        assert_eq!(app.console.len(), MAX_CONSOLE_LINES);
        assert_eq!(app.console[0], "10");
    }
}
