use crate::columns::{ColumnSchema, Field};
use crate::normalize::normalize;
use crate::schema::WeeklyMetrics;

/// A sheet row as returned by the values endpoint. Rows are ragged:
/// trailing empty cells are simply absent.
pub type RawRow = Vec<String>;

/// Reads a cell through the schema. Unmapped fields and cells past the end
/// of a short row are `None`.
pub fn cell<'a>(row: &'a [String], schema: &ColumnSchema, field: Field) -> Option<&'a str> {
    schema
        .index_of(field)
        .and_then(|idx| row.get(idx))
        .map(String::as_str)
}

/// Decodes one sheet row into typed weekly metrics. Pure and infallible.
pub fn decode_row(row: &[String], schema: &ColumnSchema) -> WeeklyMetrics {
    let num = |field: Field| normalize(cell(row, schema, field));

    let invested = num(Field::Invested);
    let funnel_revenue = num(Field::FunnelRevenue);

    WeeklyMetrics {
        invested,
        traffic_revenue: num(Field::TrafficRevenue),
        traffic_roas: num(Field::TrafficRoas),
        students: num(Field::Students),
        forms: num(Field::Forms),
        form_fill_rate: num(Field::FormFillRate),
        qualified: num(Field::Qualified),
        scheduled_calls: num(Field::ScheduledCalls),
        scheduling_rate: num(Field::SchedulingRate),
        calls_completed: num(Field::CallsCompleted),
        attendance_rate: num(Field::AttendanceRate),
        sales: num(Field::Sales),
        sales_conversion_rate: num(Field::SalesConversionRate),
        ascension_rate: num(Field::AscensionRate),
        monetization_sale: num(Field::MonetizationSale),
        deposit: num(Field::Deposit),
        funnel_revenue,
        funnel_profit: num(Field::FunnelProfit),
        // The sheet's own ROAS cell is often stale or #DIV/0!.
        funnel_roas: WeeklyMetrics::derive_funnel_roas(funnel_revenue, invested),
    }
}
