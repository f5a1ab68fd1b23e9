// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

use rust_decimal::Decimal;
use smb_erp::domain::item::ItemDetails;
use smb_erp::domain::{Customer, Item};
use smb_erp::{CustomerStatus, Unit};

// ==========================================
// Customer 构建器
// ==========================================

pub struct CustomerBuilder {
    customer: Customer,
}

impl CustomerBuilder {
    pub fn new(first_name: &str, last_name: &str) -> Self {
        let mut customer = Customer::new(first_name, last_name, "Teststraße 1", "1010", "Wien");
        customer.email = Some(format!(
            "{}.{}@example.at",
            first_name.to_lowercase(),
            last_name.to_lowercase()
        ));
        Self { customer }
    }

    pub fn company(mut self, name: &str) -> Self {
        self.customer.company_name = Some(name.to_string());
        self
    }

    pub fn city(mut self, city: &str) -> Self {
        self.customer.billing_city = city.to_string();
        self
    }

    pub fn payment_terms(mut self, days: i32) -> Self {
        self.customer.payment_term_days = days;
        self
    }

    pub fn skonto(mut self, pct: Decimal, days: i32) -> Self {
        self.customer.discount_percentage = Some(pct);
        self.customer.discount_days = Some(days);
        self
    }

    pub fn status(mut self, status: CustomerStatus) -> Self {
        self.customer.status = status;
        self
    }

    pub fn build(self) -> Customer {
        self.customer
    }
}

// ==========================================
// Item 构建器
// ==========================================

pub struct ItemBuilder {
    item: Item,
}

impl ItemBuilder {
    pub fn product(item_number: &str, sale_price: Decimal) -> Self {
        Self {
            item: Item::new_product(item_number, &format!("Artikel {}", item_number), sale_price),
        }
    }

    pub fn service(item_number: &str, sale_price: Decimal) -> Self {
        Self {
            item: Item::new_service(item_number, &format!("Leistung {}", item_number), sale_price),
        }
    }

    pub fn stock(mut self, quantity: Decimal, minimum: Decimal) -> Self {
        if let ItemDetails::Product(p) = &mut self.item.details {
            p.stock_quantity = quantity;
            p.minimum_stock = minimum;
        }
        self
    }

    pub fn vat_rate(mut self, rate: Decimal) -> Self {
        self.item.vat_rate = rate;
        self
    }

    pub fn unit(mut self, unit: Unit) -> Self {
        self.item.unit = unit;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.item.is_active = false;
        self
    }

    pub fn build(self) -> Item {
        self.item
    }
}
