use crate::certportal::{CertPortalApi, FactoryPayload};
use crate::fields::FieldKey;

use super::{lookup_by_name, SectionContext};
use crate::submit::outcome::SectionRun;

/// Make sure the record has a usable factory id, creating and attaching a
/// factory when none exists yet.
///
/// The account's factory list is fetched fresh, once, right before the
/// exists-check — the list never crosses scopes, so a stale copy can't leak
/// into the decision. Resolution failures name the missing fields so the
/// operator can fix the form data.
pub(crate) async fn ensure_factory(
    run: &mut SectionRun,
    ctx: &mut SectionContext<'_>,
    portal: &dyn CertPortalApi,
) -> Option<String> {
    if let Some(existing) = &ctx.pabrik_id {
        return Some(existing.clone());
    }

    let Some(factory_name) = ctx.fields.get(FieldKey::FactoryName) else {
        run.note("Gagal membuat pabrik: nama pabrik kosong");
        return None;
    };
    let factory_name = factory_name.to_string();

    // Exists-check against a fresh list; an already-registered factory is
    // reused and attached instead of duplicated.
    let listed = portal.list_factories().await;
    if run.record("memuat daftar pabrik", &listed) {
        if let Some(found) = find_factory_id(&listed, &factory_name) {
            let attach = portal.attach_factory(&ctx.reg_id, &found).await;
            run.record("menautkan pabrik ke registrasi", &attach);
            ctx.pabrik_id = Some(found.clone());
            return Some(found);
        }
    }

    // Resolve location and status codes by case-insensitive exact name.
    let mut missing: Vec<&str> = Vec::new();

    let province_name = ctx.fields.get_or_default(FieldKey::FactoryProvince);
    let provinces = portal.provinces().await;
    run.record("memuat master provinsi", &provinces);
    let province_code = lookup_by_name(&provinces, &province_name, "code");

    let city_code = match &province_code {
        Some(code) => {
            let districts = portal.districts(code).await;
            run.record("memuat master kabupaten", &districts);
            lookup_by_name(
                &districts,
                &ctx.fields.get_or_default(FieldKey::FactoryCity),
                "code",
            )
        }
        // Without a province there is no scoped district list to search.
        None => None,
    };

    let statuses = portal.factory_statuses().await;
    run.record("memuat master status pabrik", &statuses);
    let status_code = lookup_by_name(
        &statuses,
        &ctx.fields.get_or_default(FieldKey::FactoryStatus),
        "code",
    );

    if province_code.is_none() {
        missing.push("province");
    }
    if city_code.is_none() {
        missing.push("city");
    }
    if status_code.is_none() {
        missing.push("status");
    }
    if !missing.is_empty() {
        run.note(format!(
            "Gagal membuat pabrik: data {} tidak ditemukan",
            missing.join(", ")
        ));
        return None;
    }

    let payload = FactoryPayload {
        nama_pabrik: factory_name.clone(),
        alamat: ctx.fields.get_or_default(FieldKey::FactoryAddress),
        kode_kabupaten: city_code.unwrap_or_default(),
        kode_provinsi: province_code.unwrap_or_default(),
        status_pabrik: status_code.unwrap_or_default(),
    };
    let created = portal.create_factory(&payload).await;
    if !run.record("membuat pabrik", &created) {
        return None;
    }

    // The create call does not echo an id; look the new factory up by name
    // and bind it to the registration right away.
    let refreshed = portal.list_factories().await;
    run.record("memuat daftar pabrik", &refreshed);
    let Some(new_id) = find_factory_id(&refreshed, &factory_name) else {
        run.note(format!(
            "Gagal membuat pabrik: pabrik '{factory_name}' tidak ditemukan setelah dibuat"
        ));
        return None;
    };

    let attach = portal.attach_factory(&ctx.reg_id, &new_id).await;
    run.record("menautkan pabrik ke registrasi", &attach);

    ctx.pabrik_id = Some(new_id.clone());
    Some(new_id)
}

/// Match a factory row by case-insensitive exact name.
pub(crate) fn find_factory_id(
    listed: &crate::certportal::ApiResult,
    name: &str,
) -> Option<String> {
    listed
        .data_items()
        .iter()
        .find(|item| {
            item.get("nama_pabrik")
                .and_then(serde_json::Value::as_str)
                .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name))
        })
        .and_then(|item| item.get("id").and_then(super::value_to_string))
}
