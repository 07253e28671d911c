use chrono::{Local, NaiveDate};
use tauri::{
    menu::{Menu, MenuItem as TrayMenuItem},
    tray::{MouseButton, MouseButtonState, TrayIconBuilder, TrayIconEvent},
    AppHandle, Manager,
};
use tauri_plugin_opener::OpenerExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::commands::{matches, orders, reports, settings, tables};
use crate::db::{Database, DATABASE_FILE};
use crate::error::{AppError, AppResult};
use crate::models::{
    Bill, CheckoutSummary, CreateMatchRecord, CreateMenuItem, CreateTable, DaySummary, MatchRecord,
    MenuItem, PriceConfig, PricingConfig, Table, TimeSlot, UpdateTable,
};

pub trait DatabaseExt {
    fn db(&self) -> &Database;
}

impl DatabaseExt for AppHandle {
    fn db(&self) -> &Database {
        self.state::<Database>().inner()
    }
}

// Pricing

#[tauri::command]
fn get_pricing_config(app: AppHandle) -> AppResult<PricingConfig> {
    settings::get_pricing_config(app.db())
}

#[tauri::command]
fn update_base_rates(app: AppHandle, base_rates: PriceConfig) -> AppResult<PricingConfig> {
    settings::update_base_rates(app.db(), base_rates)
}

#[tauri::command]
fn update_time_slots(app: AppHandle, time_slots: Vec<TimeSlot>) -> AppResult<PricingConfig> {
    settings::update_time_slots(app.db(), time_slots)
}

#[tauri::command]
fn reset_pricing_config(app: AppHandle) -> AppResult<PricingConfig> {
    settings::reset_pricing_config(app.db())
}

// Tables

#[tauri::command]
fn get_tables(app: AppHandle) -> AppResult<Vec<Table>> {
    tables::get_tables(app.db())
}

#[tauri::command]
fn get_table(app: AppHandle, id: i64) -> AppResult<Table> {
    tables::get_table(app.db(), id)
}

#[tauri::command]
fn create_table(app: AppHandle, table: CreateTable) -> AppResult<Table> {
    tables::create_table(app.db(), table)
}

#[tauri::command]
fn update_table(app: AppHandle, table: UpdateTable) -> AppResult<Table> {
    tables::update_table(app.db(), table)
}

#[tauri::command]
fn start_session(app: AppHandle, table_id: i64) -> AppResult<Table> {
    tables::start_session(app.db(), table_id, Local::now().timestamp_millis())
}

#[tauri::command]
fn move_session(app: AppHandle, from_table_id: i64, to_table_id: i64) -> AppResult<Table> {
    tables::move_session(app.db(), from_table_id, to_table_id)
}

#[tauri::command]
fn set_maintenance(app: AppHandle, table_id: i64, under_maintenance: bool) -> AppResult<Table> {
    tables::set_maintenance(app.db(), table_id, under_maintenance)
}

#[tauri::command]
fn unlock_table(app: AppHandle, table_id: i64) -> AppResult<Table> {
    tables::unlock_table(app.db(), table_id)
}

#[tauri::command]
fn verify_table_password(app: AppHandle, table_id: i64, password: String) -> AppResult<bool> {
    tables::verify_table_password(app.db(), table_id, &password)
}

#[tauri::command]
fn preview_checkout(
    app: AppHandle,
    table_id: i64,
    discount_percent: Option<f64>,
) -> AppResult<CheckoutSummary> {
    tables::preview_checkout(app.db(), table_id, discount_percent.unwrap_or(0.0), &Local::now())
}

#[tauri::command]
fn checkout(app: AppHandle, table_id: i64, discount_percent: Option<f64>) -> AppResult<Bill> {
    tables::checkout(app.db(), table_id, discount_percent.unwrap_or(0.0), &Local::now())
}

#[tauri::command]
fn open_table_camera(app: AppHandle, table_id: i64) -> AppResult<()> {
    let table = tables::get_table(app.db(), table_id)?;
    let url = table
        .camera_url
        .ok_or_else(|| AppError::InvalidState(format!("{} has no camera configured", table.name)))?;

    app.opener()
        .open_url(url, None::<&str>)
        .map_err(|e| AppError::InvalidState(format!("Failed to open camera stream: {}", e)))
}

// Menu and orders

#[tauri::command]
fn get_menu(app: AppHandle) -> AppResult<Vec<MenuItem>> {
    orders::get_menu(app.db())
}

#[tauri::command]
fn create_menu_item(app: AppHandle, item: CreateMenuItem) -> AppResult<MenuItem> {
    orders::create_menu_item(app.db(), item)
}

#[tauri::command]
fn add_order_item(
    app: AppHandle,
    table_id: i64,
    menu_item_id: i64,
    quantity: Option<i32>,
) -> AppResult<Table> {
    orders::add_order_item(app.db(), table_id, menu_item_id, quantity.unwrap_or(1))
}

#[tauri::command]
fn remove_order_item(app: AppHandle, table_id: i64, menu_item_id: i64) -> AppResult<Table> {
    orders::remove_order_item(app.db(), table_id, menu_item_id)
}

// Reports

#[tauri::command]
fn get_bills(app: AppHandle, limit: Option<i32>) -> AppResult<Vec<Bill>> {
    reports::get_bills(app.db(), limit)
}

#[tauri::command]
fn get_day_summary(app: AppHandle, date: Option<String>) -> AppResult<DaySummary> {
    let date = match date {
        Some(d) => NaiveDate::parse_from_str(&d, "%Y-%m-%d")
            .map_err(|e| AppError::Validation(format!("Invalid date '{}': {}", d, e)))?,
        None => Local::now().date_naive(),
    };
    reports::get_day_summary(app.db(), date, &Local)
}

// Matches

#[tauri::command]
fn record_match(app: AppHandle, record: CreateMatchRecord) -> AppResult<MatchRecord> {
    matches::record_match(app.db(), record)
}

#[tauri::command]
fn get_match_history(app: AppHandle, limit: Option<i32>) -> AppResult<Vec<MatchRecord>> {
    matches::get_match_history(app.db(), limit)
}

fn init_tracing() {
    let env_filter = if let Ok(from_env) = EnvFilter::try_from_default_env() {
        from_env
    } else if cfg!(debug_assertions) {
        EnvFilter::new("info,tao=error,billiard_club_lib=debug")
    } else {
        EnvFilter::new("warn,tao=error")
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_level(true))
        .init();
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    init_tracing();

    let result = tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            // Initialize database
            let app_dir = app.path().app_data_dir()?;
            std::fs::create_dir_all(&app_dir)?;
            let db_path = app_dir.join(DATABASE_FILE);
            let db = Database::open(&db_path)?;
            tracing::info!(path = %db_path.display(), "Database ready");
            app.manage(db);

            // Create tray menu
            let quit = TrayMenuItem::with_id(app, "quit", "Quit", true, None::<&str>)?;
            let menu = Menu::with_items(app, &[&quit])?;

            let mut tray = TrayIconBuilder::new()
                .menu(&menu)
                .show_menu_on_left_click(false);
            if let Some(icon) = app.default_window_icon() {
                tray = tray.icon(icon.clone());
            }

            tray.on_tray_icon_event(|tray, event| {
                if let TrayIconEvent::Click {
                    button: MouseButton::Left,
                    button_state: MouseButtonState::Up,
                    ..
                } = event
                {
                    let app = tray.app_handle();
                    if let Some(window) = app.get_webview_window("main") {
                        if window.is_visible().unwrap_or(false) {
                            let _ = window.hide();
                        } else {
                            let _ = window.show();
                            let _ = window.set_focus();
                        }
                    }
                }
            })
            .on_menu_event(|app, event| {
                if event.id == "quit" {
                    app.exit(0);
                }
            })
            .build(app)?;

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Pricing
            get_pricing_config,
            update_base_rates,
            update_time_slots,
            reset_pricing_config,
            // Tables
            get_tables,
            get_table,
            create_table,
            update_table,
            start_session,
            move_session,
            set_maintenance,
            unlock_table,
            verify_table_password,
            preview_checkout,
            checkout,
            open_table_camera,
            // Menu and orders
            get_menu,
            create_menu_item,
            add_order_item,
            remove_order_item,
            // Reports
            get_bills,
            get_day_summary,
            // Matches
            record_match,
            get_match_history,
        ])
        .run(tauri::generate_context!());

    if let Err(e) = result {
        tracing::error!(error = %e, "Application exited with an error");
        std::process::exit(1);
    }
}
