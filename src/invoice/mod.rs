//! GST tax invoices.
//!
//! Invoices are derived on demand from the current order snapshot and the
//! seller's business profile. Nothing is persisted, so an invoice rendered
//! after an admin item edit shows the edited values under the same number.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::config::SiteSettings;
use crate::domain::aggregates::{Address, LineItem, Order, PaymentMethod};
use crate::domain::lifecycle::{OrderStatus, PaymentStatus};
use crate::domain::value_objects::{Money, OrderNumber};

/// Combined GST rate; split evenly into CGST and SGST.
pub const GST_RATE_PERCENT: u32 = 18;

/// Seller registration details printed on every invoice.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub legal_name: String,
    pub address: String,
    pub gst_number: String,
    pub phone: String,
    pub email: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GstBreakdown {
    pub rate_percent: u32,
    pub cgst: Money,
    pub sgst: Money,
    pub total_tax: Money,
}

impl GstBreakdown {
    pub fn for_subtotal(subtotal: Money) -> Self {
        let half_rate = Decimal::new(i64::from(GST_RATE_PERCENT), 2) / Decimal::from(2);
        let cgst = subtotal.scale(half_rate);
        let sgst = subtotal.scale(half_rate);
        Self { rate_percent: GST_RATE_PERCENT, cgst, sgst, total_tax: cgst + sgst }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Invoice {
    pub invoice_number: String,
    pub order_id: Uuid,
    pub order_number: OrderNumber,
    pub issued_at: DateTime<Utc>,
    pub seller: BusinessProfile,
    pub customer: Address,
    pub customer_email: Option<String>,
    pub customer_gst_number: Option<String>,
    pub lines: Vec<LineItem>,
    pub subtotal: Money,
    pub discount: Money,
    pub shipping: Money,
    pub gst: GstBreakdown,
    /// Amount collected on delivery; equal to the order total.
    pub grand_total: Money,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
}

impl Invoice {
    pub fn for_order(order: &Order, seller: &BusinessProfile) -> Self {
        let totals = order.totals();
        Self {
            invoice_number: format!("INV-{}", order.order_number().sequence()),
            order_id: order.id(),
            order_number: order.order_number(),
            issued_at: order.created_at(),
            seller: seller.clone(),
            customer: order.shipping_address().clone(),
            customer_email: order.customer_email().map(str::to_string),
            customer_gst_number: order.gst_number().map(str::to_string),
            lines: order.items().to_vec(),
            subtotal: totals.subtotal,
            discount: totals.discount,
            shipping: totals.shipping,
            gst: GstBreakdown::for_subtotal(totals.subtotal),
            grand_total: totals.total,
            payment_method: order.payment_method(),
            payment_status: order.payment_status(),
            status: order.status(),
        }
    }
}

/// Embeddable fragment for on-screen display.
pub fn render_view(invoice: &Invoice, site: &SiteSettings) -> String {
    format!(
        "<section class=\"invoice\" style=\"--brand: {color}\">\n\
         <style>.invoice h1, .invoice h2 {{ color: var(--brand); }}</style>\n{body}</section>\n",
        color = Escaped(&site.brand_color),
        body = InvoiceBody { invoice, site },
    )
}

/// Standalone document that opens the browser print dialog on load.
pub fn render_print(invoice: &Invoice, site: &SiteSettings) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>Invoice {number}</title>\n\
         <style>\nbody {{ font-family: sans-serif; margin: 24px; color: #222; }}\n\
         h1, h2 {{ color: {color}; }}\ntable {{ width: 100%; border-collapse: collapse; }}\n\
         th, td {{ border-bottom: 1px solid #ddd; padding: 6px; text-align: left; }}\n\
         .amount {{ text-align: right; }}\n@media print {{ body {{ margin: 0; }} }}\n</style>\n</head>\n\
         <body onload=\"window.print()\">\n{body}</body>\n</html>\n",
        number = Escaped(&invoice.invoice_number),
        color = Escaped(&site.brand_color),
        body = InvoiceBody { invoice, site },
    )
}

struct InvoiceBody<'a> {
    invoice: &'a Invoice,
    site: &'a SiteSettings,
}

impl fmt::Display for InvoiceBody<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inv = self.invoice;
        let seller = &inv.seller;
        writeln!(f, "<header>")?;
        writeln!(f, "<h1>{}</h1>", Escaped(&self.site.store_name))?;
        writeln!(f, "<p>{}<br>{}</p>", Escaped(&seller.legal_name), Escaped(&seller.address))?;
        writeln!(f, "<p>GSTIN: {}<br>Phone: {}</p>", Escaped(&seller.gst_number), Escaped(&seller.phone))?;
        if let Some(email) = &seller.email {
            writeln!(f, "<p>Email: {}</p>", Escaped(email))?;
        }
        writeln!(f, "</header>")?;

        writeln!(f, "<h2>Tax Invoice {}</h2>", Escaped(&inv.invoice_number))?;
        writeln!(
            f,
            "<p>Order: {}<br>Date: {}<br>Payment: {} ({})</p>",
            inv.order_number,
            inv.issued_at.format("%d %b %Y"),
            payment_label(inv.payment_method),
            inv.payment_status,
        )?;

        let c = &inv.customer;
        writeln!(f, "<div class=\"bill-to\">\n<h3>Bill To / Ship To</h3>")?;
        write!(f, "<p>{}<br>{}", Escaped(&c.full_name), Escaped(&c.address_line1))?;
        if let Some(line2) = &c.address_line2 {
            write!(f, "<br>{}", Escaped(line2))?;
        }
        writeln!(
            f,
            "<br>{}, {} {}<br>{}<br>Phone: {}</p>",
            Escaped(&c.city), Escaped(&c.state), Escaped(&c.postal_code), Escaped(&c.country), Escaped(&c.phone),
        )?;
        if let Some(gstin) = &inv.customer_gst_number {
            writeln!(f, "<p>Customer GSTIN: {}</p>", Escaped(gstin))?;
        }
        writeln!(f, "</div>")?;

        writeln!(f, "<table class=\"lines\">")?;
        writeln!(f, "<tr><th>Item</th><th class=\"amount\">Qty</th><th class=\"amount\">Price</th><th class=\"amount\">Total</th></tr>")?;
        for line in &inv.lines {
            writeln!(
                f,
                "<tr><td>{}</td><td class=\"amount\">{}</td><td class=\"amount\">{}</td><td class=\"amount\">{}</td></tr>",
                Escaped(&line.product_name), line.quantity.get(), Rupees(line.price), Rupees(line.line_total()),
            )?;
        }
        writeln!(f, "</table>")?;

        writeln!(f, "<table class=\"summary\">")?;
        summary_row(f, "Subtotal", &Rupees(inv.subtotal))?;
        if inv.discount > Money::zero() {
            summary_row(f, "Discount", &format!("-{}", Rupees(inv.discount)))?;
        }
        if inv.shipping.is_zero() {
            summary_row(f, "Shipping", &"FREE")?;
        } else {
            summary_row(f, "Shipping", &Rupees(inv.shipping))?;
        }
        let half = inv.gst.rate_percent / 2;
        summary_row(f, &format!("CGST ({half}%)"), &Rupees(inv.gst.cgst))?;
        summary_row(f, &format!("SGST ({half}%)"), &Rupees(inv.gst.sgst))?;
        summary_row(f, "Grand Total", &Rupees(inv.grand_total))?;
        writeln!(f, "</table>")
    }
}

fn summary_row(f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display) -> fmt::Result {
    writeln!(f, "<tr><th>{label}</th><td class=\"amount\">{value}</td></tr>")
}

fn payment_label(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::CashOnDelivery => "Cash on Delivery",
    }
}

struct Rupees(Money);

impl fmt::Display for Rupees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "₹{}", self.0) }
}

/// HTML-escapes text supplied by shoppers or admins.
struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ch in self.0.chars() {
            match ch {
                '&' => f.write_str("&amp;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '"' => f.write_str("&quot;")?,
                '\'' => f.write_str("&#39;")?,
                c => write!(f, "{c}")?,
            }
        }
        Ok(())
    }
}
