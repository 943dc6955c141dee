//! GET-object end-to-end tests through the AWS SDK.

#[cfg(test)]
mod tests {
    use aws_sdk_s3::error::ProvideErrorMetadata;
    use bytes::Bytes;
    use stripegate_engine::ObjectSpec;

    use crate::{s3_client, start_server};

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn test_should_get_full_object() {
        let server = start_server().await;
        server.backend.create_bucket("media");
        let data = patterned(100_000);
        let record = server.backend.put_object(
            "media",
            "clip.bin",
            Bytes::from(data.clone()),
            ObjectSpec::default(),
        );

        let client = s3_client(server.addr);
        let resp = client
            .get_object()
            .bucket("media")
            .key("clip.bin")
            .send()
            .await
            .expect("get_object");

        assert_eq!(resp.content_length(), Some(100_000));
        assert_eq!(resp.e_tag(), Some(record.etag().as_str()));
        let body = resp.body.collect().await.expect("body").into_bytes();
        assert_eq!(body.as_ref(), data.as_slice());
    }

    #[tokio::test]
    async fn test_should_get_zero_length_object() {
        let server = start_server().await;
        server.backend.create_bucket("b");
        server
            .backend
            .put_object("b", "empty", Bytes::new(), ObjectSpec::default());

        let client = s3_client(server.addr);
        let resp = client
            .get_object()
            .bucket("b")
            .key("empty")
            .send()
            .await
            .expect("get_object");

        assert_eq!(resp.content_length(), Some(0));
        assert_eq!(resp.e_tag(), Some("\"d41d8cd98f00b204e9800998ecf8427e\""));
        let body = resp.body.collect().await.expect("body").into_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_should_get_byte_range() {
        let server = start_server().await;
        server.backend.create_bucket("b");
        let data = patterned(10_000);
        server
            .backend
            .put_object("b", "k", Bytes::from(data.clone()), ObjectSpec::default());

        let client = s3_client(server.addr);
        let resp = client
            .get_object()
            .bucket("b")
            .key("k")
            .range("bytes=1000-1500")
            .send()
            .await
            .expect("get_object");

        assert_eq!(resp.content_range(), Some("bytes 1000-1500/10000"));
        assert_eq!(resp.content_length(), Some(501));
        let body = resp.body.collect().await.expect("body").into_bytes();
        assert_eq!(body.as_ref(), &data[1000..=1500]);
    }

    #[tokio::test]
    async fn test_should_get_suffix_range() {
        let server = start_server().await;
        server.backend.create_bucket("b");
        let data = patterned(2000);
        server
            .backend
            .put_object("b", "k", Bytes::from(data.clone()), ObjectSpec::default());

        let client = s3_client(server.addr);
        let resp = client
            .get_object()
            .bucket("b")
            .key("k")
            .range("bytes=-500")
            .send()
            .await
            .expect("get_object");

        assert_eq!(resp.content_range(), Some("bytes 1500-1999/2000"));
        let body = resp.body.collect().await.expect("body").into_bytes();
        assert_eq!(body.as_ref(), &data[1500..]);
    }

    #[tokio::test]
    async fn test_should_serve_full_object_for_multi_range() {
        let server = start_server().await;
        server.backend.create_bucket("b");
        let data = patterned(2000);
        server
            .backend
            .put_object("b", "k", Bytes::from(data.clone()), ObjectSpec::default());

        let client = s3_client(server.addr);
        let resp = client
            .get_object()
            .bucket("b")
            .key("k")
            .range("bytes=0-10,20-30")
            .send()
            .await
            .expect("get_object");

        // Multi-range is answered with the full object and no Content-Range.
        assert_eq!(resp.content_range(), None);
        assert_eq!(resp.content_length(), Some(2000));
        let body = resp.body.collect().await.expect("body").into_bytes();
        assert_eq!(body.as_ref(), data.as_slice());
    }

    #[tokio::test]
    async fn test_should_reject_unsatisfiable_range() {
        let server = start_server().await;
        server.backend.create_bucket("b");
        server
            .backend
            .put_object("b", "k", Bytes::from(patterned(2000)), ObjectSpec::default());

        let client = s3_client(server.addr);
        let err = client
            .get_object()
            .bucket("b")
            .key("k")
            .range("bytes=5000-")
            .send()
            .await
            .expect_err("range past the end should fail");

        let service_err = err.into_service_error();
        assert_eq!(service_err.meta().code(), Some("InvalidRange"));
    }

    #[tokio::test]
    async fn test_should_report_no_such_key() {
        let server = start_server().await;
        server.backend.create_bucket("b");

        let client = s3_client(server.addr);
        let err = client
            .get_object()
            .bucket("b")
            .key("missing")
            .send()
            .await
            .expect_err("missing key should fail");

        assert!(err.into_service_error().is_no_such_key());
    }

    #[tokio::test]
    async fn test_should_report_no_such_bucket() {
        let server = start_server().await;

        let client = s3_client(server.addr);
        let err = client
            .get_object()
            .bucket("missing")
            .key("k")
            .send()
            .await
            .expect_err("missing bucket should fail");

        assert_eq!(err.into_service_error().meta().code(), Some("NoSuchBucket"));
    }

    #[tokio::test]
    async fn test_should_echo_user_metadata() {
        let server = start_server().await;
        server.backend.create_bucket("b");
        server.backend.put_object(
            "b",
            "k",
            Bytes::from(patterned(10)),
            ObjectSpec {
                content_type: "text/plain".to_owned(),
                user_attributes: vec![("x-amz-meta-owner".to_owned(), "ops".to_owned())],
                tag_count: 2,
                layout_id: None,
            },
        );

        let client = s3_client(server.addr);
        let resp = client
            .get_object()
            .bucket("b")
            .key("k")
            .send()
            .await
            .expect("get_object");

        assert_eq!(resp.content_type(), Some("text/plain"));
        assert_eq!(
            resp.metadata().and_then(|m| m.get("owner")).map(String::as_str),
            Some("ops")
        );
        assert_eq!(resp.tag_count(), Some(2));
    }

    #[tokio::test]
    async fn test_should_reject_requests_while_quiescing() {
        let server = start_server().await;
        server.backend.create_bucket("b");
        server
            .backend
            .put_object("b", "k", Bytes::from(patterned(100)), ObjectSpec::default());

        server.shutdown.begin_quiesce();

        let client = s3_client(server.addr);
        let err = client
            .get_object()
            .bucket("b")
            .key("k")
            .send()
            .await
            .expect_err("quiescing server should refuse");

        assert_eq!(
            err.into_service_error().meta().code(),
            Some("ServiceUnavailable")
        );
    }
}
