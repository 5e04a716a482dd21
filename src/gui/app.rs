use anyhow::Result;
use eframe::egui;
use std::sync::Arc;

use crate::core::{
    config::ScanConfig,
    controller::{ScanController, ScanRecord, ScanStatus},
};

pub struct IdmScannerApp {
    controller: ScanController,
    // Captured once when the scan completes
    result: Option<ScanRecord>,
}

impl IdmScannerApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: ScanConfig) -> Self {
        let mut controller = ScanController::pcsc(config);
        controller.start();

        Self {
            controller,
            result: None,
        }
    }

    fn rescan(&mut self) {
        self.result = None;
        self.controller.start();
    }
}

/// Status line shown above the identifier
pub fn status_text(status: &ScanStatus) -> &'static str {
    if !status.ok {
        "ERROR"
    } else if status.ready {
        "OK"
    } else if status.running {
        "OK (scanning)"
    } else {
        "OK (idle)"
    }
}

/// Identifier line: the spaced hex identifier, or a placeholder while waiting
pub fn idm_text(result: Option<&ScanRecord>) -> String {
    result
        .map(|record| record.identifier.to_string())
        .unwrap_or_else(|| "waiting...".to_string())
}

impl eframe::App for IdmScannerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.result.is_none() && self.controller.is_ready() {
            self.result = self.controller.record();
        }
        let status = self.controller.status();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("IDm Scanner");
            ui.separator();

            ui.horizontal(|ui| {
                ui.label("Status:");
                let color = if status.ok {
                    egui::Color32::from_rgb(0, 150, 0)
                } else {
                    egui::Color32::from_rgb(200, 0, 0)
                };
                ui.colored_label(color, status_text(&status));
            });

            ui.horizontal(|ui| {
                ui.label("IDm:");
                ui.monospace(idm_text(self.result.as_ref()));
            });

            if let Some(ref record) = self.result {
                if let Some(ref reader) = record.reader {
                    ui.label(format!("Reader: {reader}"));
                }
                if let Some(protocol) = record.protocol {
                    ui.label(format!("Protocol: {protocol}"));
                }
                if let Some(read_at) = record.read_at {
                    ui.label(format!("Read at: {}", read_at.format("%H:%M:%S")));
                }
            }

            ui.separator();
            if ui.button("Rescan").clicked() {
                self.rescan();
            }
        });

        // Keep polling the scanner even without user input
        ctx.request_repaint_after(self.controller.config().poll_interval());
    }
}

pub fn run_gui(config: ScanConfig) -> Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([420.0, 220.0])
            .with_min_inner_size([320.0, 180.0])
            .with_icon(Arc::new(egui::IconData::default())),
        ..Default::default()
    };

    eframe::run_native(
        "IDm Scanner",
        options,
        Box::new(move |cc| Ok(Box::new(IdmScannerApp::new(cc, config)))),
    )
    .map_err(|e| anyhow::anyhow!("GUI error: {}", e))
}
