// ==========================================
// 中小企业 ERP - 演示数据库
// ==========================================
// 用法: seed_demo_db [db_path]
// 备份并重建数据库，写入公司、邮件模板、客户、商品与服务、示例发票
// ==========================================

use chrono::{Duration, Local};
use rust_decimal::Decimal;
use std::error::Error;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use smb_erp::api::{CreateInvoiceRequest, NewLine};
use smb_erp::app::{get_default_db_path, AppState};
use smb_erp::domain::item::ItemDetails;
use smb_erp::domain::{BankAccount, Company, Customer, EmailTemplate, Item};
use smb_erp::{logging, EmailTemplateType, Unit};

const OPERATOR: &str = "seed";

fn main() -> Result<(), Box<dyn Error>> {
    logging::init();

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    backup_and_reset_db(&db_path)?;

    let state = AppState::new(db_path.clone())?;
    seed_company(&state)?;
    seed_templates(&state)?;
    let customers = seed_customers(&state)?;
    let items = seed_items(&state)?;
    seed_invoices(&state, &customers, &items)?;

    let today = Local::now().date_naive();
    let summary = state.dashboard_api.summary(today)?;
    eprintln!("Seeded {}", db_path);
    eprintln!("{}", summary.summary_line());
    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

fn dec(s: &str) -> Result<Decimal, Box<dyn Error>> {
    Ok(Decimal::from_str(s)?)
}

fn seed_company(state: &AppState) -> Result<(), Box<dyn Error>> {
    let mut company = Company::new(
        "Mustermann Consulting",
        "Mariahilfer Straße 12",
        "1070",
        "Wien",
        "office@mustermann-consulting.at",
    );
    company.legal_form = Some("GmbH".to_string());
    company.managing_director = Some("Maria Mustermann".to_string());
    company.phone = Some("+43 1 234 56 78".to_string());
    company.website = Some("https://www.mustermann-consulting.at".to_string());
    company.vat_id = Some("ATU12345678".to_string());
    company.commercial_register = Some("FN 123456a".to_string());
    company.court = Some("Handelsgericht Wien".to_string());
    company.bank = BankAccount {
        bank_name: Some("Erste Bank".to_string()),
        iban: Some("AT611904300234573201".to_string()),
        bic: Some("GIBAATWWXXX".to_string()),
        account_holder: Some("Mustermann Consulting GmbH".to_string()),
    };
    company.company_color = Some("#1F4E79".to_string());
    state.company_api.save_company(company, OPERATOR)?;
    Ok(())
}

fn seed_templates(state: &AppState) -> Result<(), Box<dyn Error>> {
    let templates = [
        (
            "Rechnung Standard",
            EmailTemplateType::Invoice,
            "Rechnung {{InvoiceNumber}} von {{CompanyName}}",
            "<p>Sehr geehrte/r {{CustomerName}},</p>\
             <p>anbei erhalten Sie die Rechnung {{InvoiceNumber}} vom {{InvoiceDate}} \
             über {{TotalAmount}}, zahlbar bis {{DueDate}}.</p>\
             <p>Mit freundlichen Grüßen<br>{{CompanyName}}</p>",
        ),
        (
            "Zahlungserinnerung",
            EmailTemplateType::PaymentReminder,
            "Zahlungserinnerung zu Rechnung {{InvoiceNumber}}",
            "<p>Sehr geehrte/r {{CustomerName}},</p>\
             <p>die Rechnung {{InvoiceNumber}} war am {{DueDate}} fällig und ist seit \
             {{DaysOverdue}} Tagen offen. Offener Betrag: {{OutstandingAmount}}.</p>\
             <p>{{CompanyName}}</p>",
        ),
        (
            "Mahnung",
            EmailTemplateType::Dunning,
            "Mahnung: Rechnung {{InvoiceNumber}}",
            "<p>Sehr geehrte/r {{CustomerName}},</p>\
             <p>trotz Erinnerung ist der Betrag von {{OutstandingAmount}} noch offen.</p>\
             <p>{{CompanyName}}</p>",
        ),
    ];

    for (name, template_type, subject, body) in templates {
        let mut template = EmailTemplate::new(name, template_type, subject, body);
        template.is_default = true;
        state.email_template_api.create_template(template, OPERATOR)?;
    }
    Ok(())
}

fn seed_customers(state: &AppState) -> Result<Vec<i64>, Box<dyn Error>> {
    let rows = [
        ("Anna", "Huber", Some("Huber Bau GmbH"), "Landstraßer Hauptstraße 5", "1030", "Wien", 30, Some("2")),
        ("Thomas", "Gruber", None, "Herrengasse 3", "8010", "Graz", 14, None),
        ("Lisa", "Wagner", Some("Wagner IT OG"), "Linzer Gasse 20", "5020", "Salzburg", 21, Some("3")),
        ("Markus", "Bauer", Some("Bauer & Söhne KG"), "Maria-Theresien-Straße 8", "6020", "Innsbruck", 10, None),
    ];

    let mut ids = Vec::new();
    for (first, last, company, street, zip, city, term, skonto) in rows {
        let mut customer = Customer::new(first, last, street, zip, city);
        customer.company_name = company.map(str::to_string);
        customer.email = Some(format!("{}.{}@example.at", first.to_lowercase(), last.to_lowercase()));
        customer.payment_term_days = term;
        if let Some(pct) = skonto {
            customer.discount_percentage = Some(dec(pct)?);
            customer.discount_days = Some(7);
        }
        ids.push(state.customer_api.create_customer(customer, OPERATOR)?.id);
    }
    Ok(ids)
}

fn seed_items(state: &AppState) -> Result<Vec<i64>, Box<dyn Error>> {
    let mut ids = Vec::new();

    let products = [
        ("P-1001", "Bürostuhl Ergo", "249.00", "12", "5", Unit::Piece),
        ("P-1002", "Schreibtisch 160x80", "389.00", "3", "4", Unit::Piece),
        ("P-1003", "Netzwerkkabel Cat6", "1.20", "500", "100", Unit::Meter),
    ];
    for (number, name, price, stock, minimum, unit) in products {
        let mut item = Item::new_product(number, name, dec(price)?);
        item.unit = unit;
        item.category = Some("Büro".to_string());
        if let ItemDetails::Product(p) = &mut item.details {
            p.stock_quantity = dec(stock)?;
            p.minimum_stock = dec(minimum)?;
            p.storage_location = Some("Lager A".to_string());
        }
        ids.push(state.item_api.create_item(item, OPERATOR)?.id);
    }

    let services = [
        ("S-2001", "IT-Beratung", "120.00", Unit::Hour, true),
        ("S-2002", "Vor-Ort-Installation", "450.00", Unit::Day, false),
        ("S-2003", "Wartungspauschale", "89.00", Unit::Flat, true),
    ];
    for (number, name, price, unit, remote) in services {
        let mut item = Item::new_service(number, name, dec(price)?);
        item.unit = unit;
        item.category = Some("Dienstleistung".to_string());
        if let ItemDetails::Service(s) = &mut item.details {
            s.can_be_remote = remote;
        }
        ids.push(state.item_api.create_item(item, OPERATOR)?.id);
    }
    Ok(ids)
}

fn seed_invoices(state: &AppState, customers: &[i64], items: &[i64]) -> Result<(), Box<dyn Error>> {
    let today = Local::now().date_naive();
    let api = &state.invoice_api;

    // 已付款
    let mut request = CreateInvoiceRequest::new(customers[0], today - Duration::days(40));
    request.subject = Some("Büroausstattung".to_string());
    let paid = api.create_invoice(request, OPERATOR)?;
    api.add_line(paid.id, catalog(items[0], "4")?, OPERATOR)?;
    api.add_line(paid.id, catalog(items[3], "6")?, OPERATOR)?;
    let paid = api.mark_sent(paid.id, today - Duration::days(40), OPERATOR)?;
    api.register_payment(paid.id, paid.total_amount, today - Duration::days(20), OPERATOR)?;

    // 逾期
    let overdue = api.create_invoice(CreateInvoiceRequest::new(customers[1], today - Duration::days(30)), OPERATOR)?;
    api.add_line(overdue.id, catalog(items[4], "1")?, OPERATOR)?;
    api.add_line(
        overdue.id,
        NewLine::Free {
            description: "Anfahrt Graz".to_string(),
            quantity: dec("1")?,
            unit: Unit::Flat,
            unit_price: dec("65.00")?,
            vat_rate: None,
            discount_percentage: None,
            additional_info: None,
        },
        OPERATOR,
    )?;
    api.mark_sent(overdue.id, today - Duration::days(30), OPERATOR)?;

    // 部分付款
    let partial = api.create_invoice(CreateInvoiceRequest::new(customers[2], today - Duration::days(5)), OPERATOR)?;
    api.add_line(partial.id, catalog(items[3], "10")?, OPERATOR)?;
    let partial = api.mark_sent(partial.id, today - Duration::days(5), OPERATOR)?;
    api.register_payment(partial.id, dec("500.00")?, today, OPERATOR)?;

    // 草稿
    let draft = api.create_invoice(CreateInvoiceRequest::new(customers[3], today), OPERATOR)?;
    api.add_line(draft.id, catalog(items[5], "12")?, OPERATOR)?;

    api.refresh_overdue_statuses(today, OPERATOR)?;
    Ok(())
}

fn catalog(item_id: i64, quantity: &str) -> Result<NewLine, Box<dyn Error>> {
    Ok(NewLine::Catalog {
        item_id,
        quantity: dec(quantity)?,
        discount_percentage: None,
        additional_info: None,
    })
}
