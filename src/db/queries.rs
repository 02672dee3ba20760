use crate::models::{
    DistributionBasis, ItemAllocation, LandedCostCharge, LandedCostItem, LandedCostVoucher,
    VoucherHeader,
};
use sqlx::PgPool;

/// 查询凭证表头
pub async fn get_voucher_header(
    pool: &PgPool,
    name: &str,
) -> Result<Option<VoucherHeader>, sqlx::Error> {
    sqlx::query_as::<_, VoucherHeader>(
        r#"
        SELECT name, distribute_charges_based_on
        FROM "tabLanded Cost Voucher"
        WHERE name = $1
        "#
    )
    .bind(name)
    .fetch_optional(pool)
    .await
}

/// 查询凭证明细 (按行号排序)
pub async fn list_voucher_items(
    pool: &PgPool,
    name: &str,
) -> Result<Vec<LandedCostItem>, sqlx::Error> {
    sqlx::query_as::<_, LandedCostItem>(
        r#"
        SELECT name as id,
               item_code,
               coalesce(amount, 0) as amount,
               coalesce(qty, 0) as qty
        FROM "tabLanded Cost Item"
        WHERE parent = $1
          AND parenttype = 'Landed Cost Voucher'
        ORDER BY idx ASC
        "#
    )
    .bind(name)
    .fetch_all(pool)
    .await
}

/// 查询凭证税费行 (按行号排序)
pub async fn list_voucher_charges(
    pool: &PgPool,
    name: &str,
) -> Result<Vec<LandedCostCharge>, sqlx::Error> {
    sqlx::query_as::<_, LandedCostCharge>(
        r#"
        SELECT name as id,
               amount,
               expense_account,
               custom_ngp_code as tag
        FROM "tabLanded Cost Taxes and Charges"
        WHERE parent = $1
          AND parenttype = 'Landed Cost Voucher'
        ORDER BY idx ASC
        "#
    )
    .bind(name)
    .fetch_all(pool)
    .await
}

/// 加载完整凭证；表头不存在时返回 None
pub async fn load_voucher(
    pool: &PgPool,
    name: &str,
) -> Result<Option<LandedCostVoucher>, sqlx::Error> {
    let Some(header) = get_voucher_header(pool, name).await? else {
        return Ok(None);
    };
    let items = list_voucher_items(pool, name).await?;
    let charges = list_voucher_charges(pool, name).await?;

    let basis = header
        .distribute_charges_based_on
        .as_deref()
        .map(DistributionBasis::from_host_label)
        .unwrap_or_default();

    Ok(Some(LandedCostVoucher {
        name: Some(header.name),
        basis,
        items,
        charges,
    }))
}

/// 批量查询物料的 NGP 编码；不存在的物料不会出现在结果中
pub async fn get_item_tags(
    pool: &PgPool,
    item_codes: &[&str],
) -> Result<Vec<(String, Option<String>)>, sqlx::Error> {
    let codes: Vec<String> = item_codes.iter().map(|c| c.to_string()).collect();
    sqlx::query_as::<_, (String, Option<String>)>(
        r#"
        SELECT name, custom_ngp_code
        FROM "tabItem"
        WHERE name = ANY($1)
        "#
    )
    .bind(codes.as_slice())
    .fetch_all(pool)
    .await
}

/// 回写各明细的分摊费用
pub async fn save_applicable_charges(
    pool: &PgPool,
    items: &[ItemAllocation],
) -> Result<u64, sqlx::Error> {
    let mut updated = 0;
    for item in items {
        let result = sqlx::query(
            r#"
            UPDATE "tabLanded Cost Item"
            SET applicable_charges = $1
            WHERE name = $2
            "#
        )
        .bind(&item.applicable_charges)
        .bind(&item.id)
        .execute(pool)
        .await?;
        updated += result.rows_affected();
    }
    Ok(updated)
}
