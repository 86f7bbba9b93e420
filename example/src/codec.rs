use bytes::Bytes;
use futures::StreamExt;
use myro::{
    Codecs, Parameter, Result,
    alloc::Heap,
    codec::CodecContext,
    field::FieldInfo,
    mysql::{Format, types},
    parameter::{Bindings, ParameterWriter},
    types::Json,
};
use serde::{Deserialize, Serialize};
use time::macros::date;

#[derive(Debug, Serialize, Deserialize)]
struct Tag {
    name: String,
    weight: f32,
}

pub async fn main() -> Result<()> {
    let codecs = Codecs::default();
    let ctx = CodecContext::default();
    tracing::info!(?codecs, "registry");

    let float = FieldInfo::new(types::FLOAT, 12);
    let value: f32 = codecs.decode(Some(Bytes::from_static(&[0x00, 0x00, 0x80, 0x3F])), &float, Format::Binary, &ctx)?;
    let null: Option<f32> = codecs.decode(None, &float, Format::Binary, &ctx)?;
    tracing::info!(value, ?null, "decoded float");

    let json = FieldInfo::new(types::JSON, 0);
    let Json(tag): Json<Tag> = codecs.decode(
        Some(Bytes::from_static(br#"{"name":"rust","weight":0.5}"#)),
        &json,
        Format::Text,
        &ctx,
    )?;
    tracing::info!(?tag, "decoded json");

    let params: Vec<Parameter> = vec![
        codecs.bind(-0.0f32, &ctx)?,
        codecs.bind(String::from("hello"), &ctx)?,
        codecs.bind(None::<i64>, &ctx)?,
        codecs.bind(date!(2024-02-29), &ctx)?,
        codecs.bind(Json(tag), &ctx)?,
    ];

    let mut writer = ParameterWriter::new();
    for param in &params {
        writer.clear();
        param.publish_text(&mut writer);
        tracing::info!(text = writer.as_str(), "text parameter");
    }

    let mut bindings = Bindings::new(&params, &Heap);
    while let Some(binary) = bindings.next().await {
        tracing::info!(binary = ?binary?, "binary parameter");
    }

    Ok(())
}
